//! Device-identity and ticket bootstrap.
//!
//! The device flow fetches a buvid pair from the fingerprint endpoint and
//! activates it with an obfuscated telemetry payload; any failure degrades to
//! locally synthesized identifiers so polling keeps working when the endpoint
//! is unreachable or has changed shape. The ticket flow is best-effort: a
//! missing ticket never blocks fetches.

use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::error::{raise_for_code, BiliError};
use crate::client::murmur3;
use crate::client::session::BiliHttp;

const SPI_URL: &str = "https://api.bilibili.com/x/frontend/finger/spi";
const ACTIVATE_URL: &str =
    "https://api.bilibili.com/x/internal/gaia-gateway/ExClimbWuzhi";
const TICKET_URL: &str =
    "https://api.bilibili.com/bapis/bilibili.api.ticket.v1.Ticket/GenWebTicket";

const TICKET_HMAC_KEY: &[u8] = b"XgwSnGZ1p";
const TICKET_KEY_ID: &str = "ec02";
const TICKET_TTL_SECS: i64 = 3 * 24 * 60 * 60;
/// Refresh when inside this margin before expiry.
const TICKET_EXPIRY_MARGIN_SECS: i64 = 60;

/// Percent-encoding set matching the frontend's referrer quoting
/// (alphanumerics, `/` and `_.-~` stay literal).
const QUOTE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Opaque identifier pair the platform uses to track a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub primary: String,
    pub secondary: String,
}

#[derive(Debug, Default)]
pub struct DeviceCache {
    identity: Option<DeviceIdentity>,
}

impl DeviceCache {
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct TicketCache {
    value: Option<String>,
    expires_at: i64,
}

impl TicketCache {
    pub fn is_fresh(&self, now: i64) -> bool {
        self.value.is_some() && now < self.expires_at - TICKET_EXPIRY_MARGIN_SECS
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Ensure an activated device identity is present in the cookie store.
/// Short-circuits once resolved; never fails.
pub async fn ensure_device(http: &dyn BiliHttp, cache: &mut DeviceCache) {
    if cache.identity.is_some() {
        return;
    }

    // Authenticated cookies may already carry a trusted pair.
    if let (Some(primary), Some(secondary)) = (http.cookie("buvid3"), http.cookie("buvid4")) {
        http.set_cookie("opus-goback", "1");
        cache.identity = Some(DeviceIdentity { primary, secondary });
        return;
    }

    let identity = match obtain_activated_pair(http).await {
        Ok(identity) => identity,
        Err(err) => {
            warn!(error = %err, "failed to obtain activated buvid pair; synthesizing local ids");
            http.set_cookie("buvid_fp", &Uuid::new_v4().simple().to_string());
            DeviceIdentity {
                primary: synth_device_id(),
                secondary: synth_device_id(),
            }
        }
    };

    http.set_cookie("buvid3", &identity.primary);
    http.set_cookie("buvid4", &identity.secondary);
    http.set_cookie("opus-goback", "1");
    cache.identity = Some(identity);
}

async fn obtain_activated_pair(http: &dyn BiliHttp) -> Result<DeviceIdentity, BiliError> {
    let identity = fetch_device_pair(http).await?;
    activate_device(http, &identity).await?;
    Ok(identity)
}

async fn fetch_device_pair(http: &dyn BiliHttp) -> Result<DeviceIdentity, BiliError> {
    let payload = http.get_json(SPI_URL, &[], &[]).await?;
    let data = payload.get("data").cloned().unwrap_or_default();
    let primary = data.get("b_3").and_then(|v| v.as_str()).unwrap_or_default();
    let secondary = data.get("b_4").and_then(|v| v.as_str()).unwrap_or_default();
    if primary.is_empty() || secondary.is_empty() {
        return Err(BiliError::Payload(
            "spi endpoint returned no buvid3/buvid4".to_string(),
        ));
    }
    Ok(DeviceIdentity {
        primary: primary.to_string(),
        secondary: secondary.to_string(),
    })
}

/// POST the obfuscated telemetry payload the frontend sends on first visit,
/// together with a `buvid_fp` fingerprint over the serialized payload.
async fn activate_device(
    http: &dyn BiliHttp,
    identity: &DeviceIdentity,
) -> Result<(), BiliError> {
    let mut rng = rand::rng();
    let uuid_infoc = gen_uuid_infoc();
    let referrer: String =
        utf8_percent_encode("https://www.bilibili.com/", QUOTE_SET).to_string();

    // Key names are the frontend's own obfuscated field ids.
    let inner = json!({
        "01bf": "",
        "c881": "",
        "42bf": "927",
        "b4e4": "1",
        "490d": "-120",
        "3009": rng.random_range(600..=800).to_string(),
        "b120": rng.random_range(500..=700).to_string(),
        "8fa6": "MacIntel",
        "3434": "zh-CN",
        "8534": "Asia/Shanghai",
        "54ef": "{\"in_new_ab\": true}",
        "dd9d": "1",
        "770c": "Mac OS",
        "81d3": "",
        "c09f": "",
        "6de2": "",
        "8956": 0,
        "a661": 0,
        "0e7b": 0,
        "7c43": 0,
        "c130": 0,
        "0ef9": 0,
        "8318": 0,
        "69ae": 1,
        "4c4a": "en-US",
        "b0cf": "Google Inc.",
        "75b1": "",
        "d02f": format!("{}", 80.0 + rng.random::<f64>() * 30.0),
        "df35": uuid_infoc.clone(),
        "8b94": referrer,
    });
    let body = json!({ "payload": inner.to_string() }).to_string();

    let fingerprint = murmur3::fingerprint_hex(&body, 31);
    http.set_cookie("buvid3", &identity.primary);
    http.set_cookie("buvid4", &identity.secondary);
    http.set_cookie("buvid_fp", &fingerprint);
    http.set_cookie("_uuid", &uuid_infoc);

    let response = http.post_json(ACTIVATE_URL, &[], Some(body), &[]).await?;
    raise_for_code(&response)?;
    http.set_cookie("buvid_fp", &fingerprint);
    Ok(())
}

/// Ensure a valid signed ticket, refreshing when inside the expiry margin.
/// Failures are logged and swallowed; requests proceed ticket-less.
pub async fn ensure_ticket(http: &dyn BiliHttp, cache: &mut TicketCache, now: i64) {
    if cache.is_fresh(now) {
        return;
    }
    match request_ticket(http, now).await {
        Ok(ticket) => {
            let expires_at = now + TICKET_TTL_SECS;
            http.set_cookie("bili_ticket", &ticket);
            http.set_cookie("bili_ticket_expires", &expires_at.to_string());
            cache.value = Some(ticket);
            cache.expires_at = expires_at;
        }
        Err(err) => debug!(error = %err, "failed to refresh bili_ticket"),
    }
}

async fn request_ticket(http: &dyn BiliHttp, now: i64) -> Result<String, BiliError> {
    let params = vec![
        ("key_id".to_string(), TICKET_KEY_ID.to_string()),
        ("hexsign".to_string(), ticket_hexsign(now)),
        ("context[ts]".to_string(), now.to_string()),
        ("csrf".to_string(), String::new()),
    ];
    let payload = http.post_json(TICKET_URL, &params, None, &[]).await?;
    payload
        .get("data")
        .and_then(|d| d.get("ticket"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BiliError::Payload("ticket response carried no ticket".to_string()))
}

/// HMAC-SHA256 over the literal string `ts<unix_seconds>` with the fixed
/// shared key, hex-encoded.
pub fn ticket_hexsign(ts: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(TICKET_HMAC_KEY)
        .expect("hmac accepts any key length");
    mac.update(format!("ts{ts}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// UUID-like identifier the frontend generates for the `_uuid` cookie:
/// 8-4-4-4-12 groups from a fixed charset, a millisecond-derived suffix and
/// the literal `infoc` tail.
fn gen_uuid_infoc() -> String {
    const CHARSET: &[u8] = b"123456789ABCDEF0";
    let mut rng = rand::rng();
    let mut group = |len: usize| -> String {
        (0..len)
            .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
            .collect()
    };
    let chunks = [group(8), group(4), group(4), group(4), group(12)];
    let now_ms = chrono::Utc::now().timestamp_millis();
    let suffix = format!("{:0<5}", (now_ms % 100_000).to_string());
    format!("{}{}infoc", chunks.join("-"), suffix)
}

fn synth_device_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}infoc", &hex[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexsign_matches_reference() {
        // HMAC-SHA256("XgwSnGZ1p", "ts1700000000")
        assert_eq!(
            ticket_hexsign(1_700_000_000),
            "bb79f0d980ffbb51597aa1a3e8b55603025cc1322ac766f4c1a98852e6182514"
        );
    }

    #[test]
    fn ticket_cache_honors_expiry_margin() {
        let mut cache = TicketCache::default();
        assert!(!cache.is_fresh(1_000));
        cache.value = Some("t".to_string());
        cache.expires_at = 1_000 + TICKET_TTL_SECS;
        assert!(cache.is_fresh(1_000));
        assert!(cache.is_fresh(1_000 + TICKET_TTL_SECS - 61));
        assert!(!cache.is_fresh(1_000 + TICKET_TTL_SECS - 60));
    }

    #[test]
    fn uuid_infoc_has_frontend_shape() {
        let id = gen_uuid_infoc();
        assert!(id.ends_with("infoc"));
        // 8-4-4-4-12 with dashes, five suffix digits, then "infoc".
        assert_eq!(id.len(), 8 + 4 + 4 + 4 + 12 + 4 + 5 + 5);
        assert_eq!(id.matches('-').count(), 4);
    }

    #[test]
    fn synthesized_ids_look_like_buvids() {
        let id = synth_device_id();
        assert_eq!(id.len(), 13);
        assert!(id.ends_with("infoc"));
    }

    #[test]
    fn referrer_is_quoted_like_the_frontend() {
        let quoted: String =
            utf8_percent_encode("https://www.bilibili.com/", QUOTE_SET).to_string();
        assert_eq!(quoted, "https%3A//www.bilibili.com/");
    }
}
