// src/client/mod.rs
//! Protocol-emulation client for the bilibili web API: anti-automation
//! bootstrap, request signing and the three content fetchers.

pub mod article;
pub mod bootstrap;
pub mod dynamic;
pub mod error;
pub mod murmur3;
pub mod session;
pub mod types;
pub mod video;
pub mod wbi;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{AuthCookies, FetchOptions};

pub use error::BiliError;
pub use session::{BiliHttp, BrowserSession};
pub use types::{Category, ContentItem, SHANGHAI_TZ};

use bootstrap::{DeviceCache, TicketCache};
use error::raise_for_code;
use wbi::WbiCache;

const FEED_URL: &str = "https://api.bilibili.com/x/polymer/web-dynamic/v1/feed/space";
const VIDEO_URL: &str = "https://api.bilibili.com/x/space/arc/search";
const ARTICLE_URL: &str = "https://api.bilibili.com/x/space/article";

/// Pause before the single retry after a stale-signature rejection.
const STALE_SIGNATURE_BACKOFF: Duration = Duration::from_millis(500);

pub const DEFAULT_DYNAMIC_LIMIT: usize = 20;
pub const DEFAULT_VIDEO_LIMIT: usize = 10;
pub const DEFAULT_ARTICLE_LIMIT: usize = 10;

/// Client owning the session and every handshake cache. Device identity,
/// ticket and signing key are independent resources behind separate guards,
/// so concurrent callers refresh them without serializing each other.
pub struct BiliClient {
    http: Arc<dyn BiliHttp>,
    device: Mutex<DeviceCache>,
    ticket: Mutex<TicketCache>,
    wbi: Mutex<WbiCache>,
}

impl BiliClient {
    pub fn new() -> Result<Self, BiliError> {
        Ok(Self::with_http(Arc::new(BrowserSession::new()?)))
    }

    /// Build against an arbitrary transport; used by tests/tools.
    pub fn with_http(http: Arc<dyn BiliHttp>) -> Self {
        Self {
            http,
            device: Mutex::new(DeviceCache::default()),
            ticket: Mutex::new(TicketCache::default()),
            wbi: Mutex::new(WbiCache::default()),
        }
    }

    /// Copy authenticated cookies into the session under the platform's
    /// cookie names. Missing or empty fields are skipped.
    pub fn apply_auth_cookies(&self, cookies: &AuthCookies) {
        let mapping = [
            ("SESSDATA", &cookies.sessdata),
            ("bili_jct", &cookies.bili_jct),
            ("buvid3", &cookies.buvid3),
            ("buvid4", &cookies.buvid4),
            ("DedeUserID", &cookies.dedeuserid),
            ("DedeUserID__ckMd5", &cookies.dedeuserid_ckmd5),
        ];
        for (name, value) in mapping {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                self.http.set_cookie(name, value);
            }
        }
    }

    /// Warm up the device identity and ticket. Short-circuits instantly once
    /// both caches are valid, so steady-state polling adds no extra calls.
    pub async fn prepare_session(&self) {
        {
            let mut device = self.device.lock().await;
            bootstrap::ensure_device(self.http.as_ref(), &mut device).await;
        }
        let now = chrono::Utc::now().timestamp();
        let mut ticket = self.ticket.lock().await;
        bootstrap::ensure_ticket(self.http.as_ref(), &mut ticket, now).await;
    }

    async fn mixin_key(&self, force_refresh: bool) -> Result<String, BiliError> {
        let now = chrono::Utc::now().timestamp();
        let mut cache = self.wbi.lock().await;
        wbi::ensure_mixin_key(self.http.as_ref(), &mut cache, now, force_refresh).await
    }

    /// Issue a signed GET with mouse-decoy injection, retrying exactly once
    /// on a `-799` (stale signature / rate limit) rejection after a forced
    /// key refresh.
    async fn signed_get(
        &self,
        url: &str,
        base_params: &[(String, String)],
        headers: &[(&'static str, String)],
    ) -> Result<Value, BiliError> {
        for attempt in 0..2u8 {
            let key = self.mixin_key(false).await?;
            let wts = chrono::Utc::now().timestamp();
            let params = wbi::sign_params(base_params, &key, wts, true);
            let payload = self.http.get_json(url, &params, headers).await?;
            match raise_for_code(&payload) {
                Ok(()) => return Ok(payload),
                Err(BiliError::Api { code: -799, .. }) if attempt == 0 => {
                    debug!(url, "refreshing wbi mixin key after -799 response");
                    self.mixin_key(true).await?;
                    tokio::time::sleep(STALE_SIGNATURE_BACKOFF).await;
                }
                Err(err) => return Err(err),
            }
        }
        Err(BiliError::Payload("empty response after retry".to_string()))
    }

    /// Fetch the latest dynamic feed items for the given user id.
    pub async fn fetch_dynamic(
        &self,
        mid: u64,
        limit: usize,
    ) -> Result<Vec<ContentItem>, BiliError> {
        self.prepare_session().await;
        let params = vec![
            ("host_mid".to_string(), mid.to_string()),
            ("timezone_offset".to_string(), "-480".to_string()),
            ("features".to_string(), "itemOpusStyle".to_string()),
        ];
        let payload = self
            .http
            .get_json(FEED_URL, &params, &space_headers(mid, "dynamic"))
            .await?;
        raise_for_code(&payload)?;

        let items = payload
            .get("data")
            .and_then(|d| d.get("items"))
            .and_then(|i| i.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(items
            .into_iter()
            .take(limit)
            .map(|raw| {
                let record: dynamic::DynamicRecord =
                    serde_json::from_value(raw).unwrap_or_default();
                dynamic::normalize(record, mid)
            })
            .collect())
    }

    /// Fetch the latest submitted videos for the given user id.
    pub async fn fetch_videos(
        &self,
        mid: u64,
        limit: usize,
    ) -> Result<Vec<ContentItem>, BiliError> {
        self.prepare_session().await;
        let base_params = vec![
            ("mid".to_string(), mid.to_string()),
            ("pn".to_string(), "1".to_string()),
            ("ps".to_string(), limit.to_string()),
            ("platform".to_string(), "web".to_string()),
        ];
        let payload = self
            .signed_get(VIDEO_URL, &base_params, &space_headers(mid, "video"))
            .await?;

        let vlist = payload
            .get("data")
            .and_then(|d| d.get("list"))
            .and_then(|l| l.get("vlist"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(vlist
            .into_iter()
            .map(|raw| {
                let record: video::VideoRecord =
                    serde_json::from_value(raw).unwrap_or_default();
                video::normalize(record)
            })
            .collect())
    }

    /// Fetch the latest articles for the given user id.
    pub async fn fetch_articles(
        &self,
        mid: u64,
        limit: usize,
    ) -> Result<Vec<ContentItem>, BiliError> {
        self.prepare_session().await;
        let base_params = vec![
            ("mid".to_string(), mid.to_string()),
            ("pn".to_string(), "1".to_string()),
            ("ps".to_string(), limit.to_string()),
            ("sort".to_string(), "publish_time".to_string()),
        ];
        let payload = self
            .signed_get(ARTICLE_URL, &base_params, &space_headers(mid, "article"))
            .await?;

        let articles = payload
            .get("data")
            .and_then(|d| d.get("articles"))
            .and_then(|a| a.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(articles
            .into_iter()
            .take(limit)
            .map(|raw| {
                let record: article::ArticleRecord =
                    serde_json::from_value(raw).unwrap_or_default();
                article::normalize(record)
            })
            .collect())
    }

    /// Fetch every enabled category for the given user, in feed, video,
    /// article order.
    pub async fn fetch_all(
        &self,
        mid: u64,
        options: &FetchOptions,
    ) -> Result<Vec<ContentItem>, BiliError> {
        let mut items = Vec::new();
        if options.dynamic {
            items.extend(self.fetch_dynamic(mid, DEFAULT_DYNAMIC_LIMIT).await?);
        }
        if options.video {
            items.extend(self.fetch_videos(mid, DEFAULT_VIDEO_LIMIT).await?);
        }
        if options.article {
            items.extend(self.fetch_articles(mid, DEFAULT_ARTICLE_LIMIT).await?);
        }
        Ok(items)
    }
}

/// Category-specific Referer/Origin headers the space frontend sends.
fn space_headers(mid: u64, section: &str) -> Vec<(&'static str, String)> {
    vec![
        ("Referer", format!("https://space.bilibili.com/{mid}/{section}")),
        ("Origin", "https://space.bilibili.com".to_string()),
    ]
}
