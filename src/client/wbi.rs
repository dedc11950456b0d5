//! WBI request signing: mixin-key derivation from the nav endpoint's asset
//! names and the `w_rid` signature over canonicalized query parameters.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use rand::Rng;
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::client::error::BiliError;
use crate::client::session::BiliHttp;

const NAV_URL: &str = "https://api.bilibili.com/x/web-interface/nav";

/// Signing keys older than this are recomputed.
const MIXIN_KEY_TTL_SECS: i64 = 3600;

/// Characters the platform strips from values before signing; leaving them
/// in invalidates the signature.
const FORBIDDEN_VALUE_CHARS: &[char] = &['!', '\'', '(', ')', '*'];

pub const DEFAULT_WEB_LOCATION: &str = "1550101";

/// Fixed permutation applied to the concatenated asset-name stems.
const MIXIN_KEY_ORDER: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 13, 41, 3, 10, 34, 6, 29, 58, 45, 4, 14, 57, 12, 37, 27,
    43, 5, 49, 26, 38, 54, 63, 9, 7, 61, 21, 48, 32, 16, 50, 28, 15, 39, 56, 62, 35, 1,
    60, 59, 24, 40, 44, 30, 52, 0, 33, 51, 22, 31, 19, 11, 36, 55, 25, 17, 42, 20,
];

#[derive(Debug, Default)]
pub struct WbiCache {
    mixin_key: Option<String>,
    fetched_at: i64,
}

impl WbiCache {
    pub fn fresh_key(&self, now: i64) -> Option<&str> {
        self.mixin_key
            .as_deref()
            .filter(|_| now - self.fetched_at <= MIXIN_KEY_TTL_SECS)
    }
}

/// Filename stem of an asset URL: everything after the last `/`, before the
/// first `.`.
fn key_stem(url: &str) -> &str {
    let name = url.rsplit('/').next().unwrap_or(url);
    name.split('.').next().unwrap_or(name)
}

/// Concatenate the two stems and apply the fixed permutation, truncated to
/// 32 characters.
pub fn mixin_key(img_key: &str, sub_key: &str) -> String {
    let raw: Vec<char> = img_key.chars().chain(sub_key.chars()).collect();
    MIXIN_KEY_ORDER
        .iter()
        .filter_map(|&idx| raw.get(idx))
        .take(32)
        .collect()
}

/// Return a fresh mixin key, deriving it from the nav endpoint when the
/// cache is absent, stale or a refresh is forced. Missing asset URLs are a
/// hard failure: nothing requiring a signature can proceed without the key.
pub async fn ensure_mixin_key(
    http: &dyn BiliHttp,
    cache: &mut WbiCache,
    now: i64,
    force_refresh: bool,
) -> Result<String, BiliError> {
    if !force_refresh {
        if let Some(key) = cache.fresh_key(now) {
            return Ok(key.to_string());
        }
    }

    let payload = http.get_json(NAV_URL, &[], &[]).await?;
    let wbi_img = payload
        .get("data")
        .and_then(|d| d.get("wbi_img"))
        .cloned()
        .unwrap_or(Value::Null);
    let img_url = wbi_img.get("img_url").and_then(|v| v.as_str()).unwrap_or_default();
    let sub_url = wbi_img.get("sub_url").and_then(|v| v.as_str()).unwrap_or_default();
    if img_url.is_empty() || sub_url.is_empty() {
        return Err(BiliError::Signing(
            "nav response carried no wbi_img asset urls".to_string(),
        ));
    }

    let key = mixin_key(key_stem(img_url), key_stem(sub_url));
    debug!(fetched_at = now, "derived wbi mixin key");
    cache.mixin_key = Some(key.clone());
    cache.fetched_at = now;
    Ok(key)
}

/// Sign `params` with the given mixin key at instant `wts`.
///
/// Values are stripped of the forbidden characters, optional decoy
/// pointer-tracking fields are injected, `web_location` defaults, keys are
/// sorted lexicographically, and `w_rid` = md5(encoded_query + mixin_key) is
/// appended. Output is byte-deterministic for fixed inputs and instant.
pub fn sign_params(
    params: &[(String, String)],
    mixin_key: &str,
    wts: i64,
    include_mouse: bool,
) -> Vec<(String, String)> {
    let mut ordered: BTreeMap<String, String> = params
        .iter()
        .map(|(key, value)| {
            let cleaned: String = value
                .chars()
                .filter(|c| !FORBIDDEN_VALUE_CHARS.contains(c))
                .collect();
            (key.clone(), cleaned)
        })
        .collect();

    if include_mouse {
        inject_mouse_decoys(&mut ordered);
    }
    ordered
        .entry("web_location".to_string())
        .or_insert_with(|| DEFAULT_WEB_LOCATION.to_string());
    ordered.insert("wts".to_string(), wts.to_string());

    // Values were stripped of !'()* above, so the form alphabet matches the
    // frontend's encoder for every byte that can still occur.
    let query: String = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(ordered.iter())
        .finish();

    let mut hasher = Md5::new();
    hasher.update(query.as_bytes());
    hasher.update(mixin_key.as_bytes());
    let w_rid = hex::encode(hasher.finalize());

    let mut signed: Vec<(String, String)> = ordered.into_iter().collect();
    signed.push(("w_rid".to_string(), w_rid));
    signed
}

/// Decoy pointer-tracking fields the frontend includes alongside signed
/// requests.
fn inject_mouse_decoys(params: &mut BTreeMap<String, String>) {
    params
        .entry("dm_img_list".to_string())
        .or_insert_with(|| "[]".to_string());
    params
        .entry("dm_img_str".to_string())
        .or_insert_with(rand_mouse_token);
    params
        .entry("dm_cover_img_str".to_string())
        .or_insert_with(rand_mouse_token);
    params
        .entry("dm_img_inter".to_string())
        .or_insert_with(|| r#"{"ds":[],"wh":[0,0,0],"of":[0,0,0]}"#.to_string());
}

/// Two distinct random characters from the frontend's token alphabet.
fn rand_mouse_token() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJK";
    let mut rng = rand::rng();
    let first = rng.random_range(0..ALPHABET.len());
    let mut second = rng.random_range(0..ALPHABET.len() - 1);
    if second >= first {
        second += 1;
    }
    format!("{}{}", ALPHABET[first] as char, ALPHABET[second] as char)
}
