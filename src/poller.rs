// src/poller.rs
//! Polling loop: iterate configured users sequentially, fetch enabled
//! categories, drop already-seen items and dispatch the rest.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{error, info, warn};

use crate::client::{
    BiliClient, BiliError, Category, ContentItem, DEFAULT_ARTICLE_LIMIT,
    DEFAULT_DYNAMIC_LIMIT, DEFAULT_VIDEO_LIMIT,
};
use crate::config::{Config, UserConfig};
use crate::notify::{build_notifiers, notify_all, Notifier};
use crate::state::State;

pub struct Monitor {
    config: Config,
    state: State,
    client: BiliClient,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl Monitor {
    pub fn new(config: Config) -> Result<Self> {
        let client = BiliClient::new()?;
        client.apply_auth_cookies(&config.auth_cookies);
        let state = State::load(&config.state_file);
        let notifiers = build_notifiers(&config);
        Ok(Self {
            config,
            state,
            client,
            notifiers,
        })
    }

    /// Fetch every enabled category for one user, applying the recoverable
    /// API-code policy: risk control and rate limiting skip the category,
    /// anything else propagates.
    async fn fetch_user_items(&self, user: &UserConfig) -> Result<Vec<ContentItem>, BiliError> {
        let mut items = Vec::new();
        let plan: [(Category, bool, usize); 3] = [
            (Category::Dynamic, user.fetch.dynamic, DEFAULT_DYNAMIC_LIMIT),
            (Category::Video, user.fetch.video, DEFAULT_VIDEO_LIMIT),
            (Category::Article, user.fetch.article, DEFAULT_ARTICLE_LIMIT),
        ];
        for (category, enabled, limit) in plan {
            if !enabled {
                continue;
            }
            let result = match category {
                Category::Dynamic => self.client.fetch_dynamic(user.mid, limit).await,
                Category::Video => self.client.fetch_videos(user.mid, limit).await,
                Category::Article => self.client.fetch_articles(user.mid, limit).await,
            };
            match result {
                Ok(mut fetched) => items.append(&mut fetched),
                Err(err) => match err.api_code() {
                    Some(-352) => {
                        warn!(
                            user = %user.display_name(),
                            category = category.as_str(),
                            "risk control triggered; consider adding auth cookies"
                        );
                        continue;
                    }
                    Some(-799) => {
                        warn!(
                            user = %user.display_name(),
                            category = category.as_str(),
                            "rate limited; will retry next cycle"
                        );
                        continue;
                    }
                    _ => return Err(err),
                },
            }
        }
        Ok(items)
    }

    /// Collect previously-unseen items for one user, oldest first. The first
    /// sight of a user primes the ledger without notifying.
    async fn collect_new_items(&mut self, user: &UserConfig) -> Result<Vec<ContentItem>, BiliError> {
        let mut items = self.fetch_user_items(user).await?;
        items.sort_by_key(|item| item.published_at.map(|dt| dt.timestamp()).unwrap_or(i64::MIN));

        if !items.is_empty() && !self.state.has_entries(user.mid) {
            info!(
                user = %user.display_name(),
                count = items.len(),
                "priming state with existing items; skipping notifications"
            );
            self.state.bulk_remember(
                items
                    .iter()
                    .map(|item| (user.mid, item.category, item.item_id.as_str())),
            );
            return Ok(Vec::new());
        }

        Ok(items
            .into_iter()
            .filter(|item| !self.state.is_seen(user.mid, item.category, &item.item_id))
            .collect())
    }

    pub async fn run_once(&mut self) {
        let users = self.config.users.clone();
        for user in &users {
            match self.collect_new_items(user).await {
                Ok(new_items) => {
                    for item in new_items {
                        info!(
                            user = %user.display_name(),
                            category = item.category.as_str(),
                            title = %item.title,
                            "new item"
                        );
                        notify_all(&self.notifiers, &item).await;
                        self.state.remember(user.mid, item.category, &item.item_id);
                    }
                }
                Err(err) => {
                    error!(user = %user.display_name(), error = %err, "failed to process user");
                }
            }
        }
        self.state.save();
    }

    pub async fn run_forever(&mut self) {
        info!(users = self.config.users.len(), "starting monitor");
        let interval = Duration::from_secs(self.config.poll_interval_seconds);
        loop {
            let started = Instant::now();
            self.run_once().await;
            let elapsed = started.elapsed();
            if let Some(remaining) = interval.checked_sub(elapsed) {
                tokio::time::sleep(remaining).await;
            }
        }
    }
}
