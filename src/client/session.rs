//! Process-wide session state: one long-lived HTTP client with
//! browser-mimicking default headers and a seeded cookie store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::client::error::BiliError;

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(12);

/// Cookie scope for everything the client touches.
static COOKIE_URL: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://api.bilibili.com/").expect("static cookie url")
});

pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("User-Agent", HeaderValue::from_static(USER_AGENT));
    headers.insert("Referer", HeaderValue::from_static("https://www.bilibili.com/"));
    headers.insert(
        "Accept",
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert("Origin", HeaderValue::from_static("https://www.bilibili.com"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(
            "\"Chromium\";v=\"131\", \"Not=A?Brand\";v=\"24\", \"Google Chrome\";v=\"131\"",
        ),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"macOS\""));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("empty"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("cors"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("same-site"));
    headers
}

/// Minimal HTTP surface the protocol flows need. Implemented by
/// [`BrowserSession`] in production; tests substitute fakes to assert call
/// counts against the cache contracts.
#[async_trait]
pub trait BiliHttp: Send + Sync {
    async fn get_json(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &[(&'static str, String)],
    ) -> Result<Value, BiliError>;

    /// POST with query parameters and an optional raw JSON body.
    async fn post_json(
        &self,
        url: &str,
        params: &[(String, String)],
        body: Option<String>,
        headers: &[(&'static str, String)],
    ) -> Result<Value, BiliError>;

    fn cookie(&self, name: &str) -> Option<String>;

    fn set_cookie(&self, name: &str, value: &str);
}

/// Long-lived reqwest client plus the cookie jar the platform's frontend
/// relies on.
pub struct BrowserSession {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl BrowserSession {
    pub fn new() -> Result<Self, BiliError> {
        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .default_headers(default_headers())
            .cookie_provider(Arc::clone(&jar))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let session = Self { client, jar };
        session.seed_basic_cookies();
        Ok(session)
    }

    /// Baseline cookies the web frontend sets unconditionally; omitting them
    /// increases the chance of being flagged.
    fn seed_basic_cookies(&self) {
        let now_ms = chrono::Utc::now().timestamp_millis().to_string();
        self.set_cookie("b_nut", &now_ms);
        self.set_cookie("i-wanna-go-back", "-1");
        self.set_cookie("CURRENT_FNVAL", "128");
        self.set_cookie("CURRENT_QUALITY", "80");
        self.set_cookie("hit-dyn-v2", "1");
        self.set_cookie(
            "b_lsid",
            &format!("{}_{now_ms}", Uuid::new_v4().simple()),
        );
        let r1 = Uuid::new_v4().simple().to_string();
        let r2 = Uuid::new_v4().simple().to_string();
        self.set_cookie("rpdid", &format!("|{}|{}|", &r1[..11], &r2[..11]));
    }
}

#[async_trait]
impl BiliHttp for BrowserSession {
    async fn get_json(
        &self,
        url: &str,
        params: &[(String, String)],
        headers: &[(&'static str, String)],
    ) -> Result<Value, BiliError> {
        let mut request = self.client.get(url).query(params);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    async fn post_json(
        &self,
        url: &str,
        params: &[(String, String)],
        body: Option<String>,
        headers: &[(&'static str, String)],
    ) -> Result<Value, BiliError> {
        let mut request = self.client.post(url).query(params);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        if let Some(body) = body {
            request = request.header("Content-Type", "application/json").body(body);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<Value>().await?)
    }

    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&COOKIE_URL)?;
        let joined = header.to_str().ok()?.to_string();
        joined.split("; ").find_map(|pair| {
            pair.strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
    }

    fn set_cookie(&self, name: &str, value: &str) {
        self.jar.add_cookie_str(
            &format!("{name}={value}; Domain=.bilibili.com; Path=/"),
            &COOKIE_URL,
        );
    }
}
