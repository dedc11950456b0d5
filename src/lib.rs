// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod client;
pub mod config;
pub mod notify;
pub mod poller;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::client::{BiliClient, BiliError, Category, ContentItem, SHANGHAI_TZ};
pub use crate::config::{load_config, AuthCookies, Config, FetchOptions};
pub use crate::poller::Monitor;
pub use crate::state::State;
