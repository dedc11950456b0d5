// src/config.rs
//! TOML configuration: watched users, auth cookies and notifier settings.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

fn default_poll_interval() -> u64 {
    60
}
fn default_state_file() -> PathBuf {
    PathBuf::from("state.json")
}
fn default_smtp_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default)]
    pub users: Vec<UserConfig>,
    #[serde(default)]
    pub auth_cookies: AuthCookies,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub mid: u64,
    pub name: Option<String>,
    #[serde(default)]
    pub fetch: FetchOptions,
}

impl UserConfig {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.mid.to_string())
    }
}

/// Per-category fetch toggles; everything is on by default.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FetchOptions {
    #[serde(default = "default_true")]
    pub dynamic: bool,
    #[serde(default = "default_true")]
    pub video: bool,
    #[serde(default = "default_true")]
    pub article: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            dynamic: true,
            video: true,
            article: true,
        }
    }
}

/// Optional authenticated-cookie bundle; any present field is copied into
/// the session under the platform's cookie name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthCookies {
    pub sessdata: Option<String>,
    pub bili_jct: Option<String>,
    pub buvid3: Option<String>,
    pub buvid4: Option<String>,
    pub dedeuserid: Option<String>,
    pub dedeuserid_ckmd5: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub serverchan: ServerChanConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_addr: Option<String>,
    #[serde(default)]
    pub to_addrs: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            use_tls: true,
            username: None,
            password: None,
            from_addr: None,
            to_addrs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerChanConfig {
    #[serde(default)]
    pub enabled: bool,
    pub sendkey: Option<String>,
}

/// Load and validate the TOML config from `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let config: Config = toml::from_str(&raw)
        .with_context(|| format!("parsing config from {}", path.display()))?;
    if config.users.is_empty() {
        bail!("config must define at least one [[users]] entry");
    }
    Ok(config)
}
