use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde_json::json;

use super::Notifier;
use crate::client::ContentItem;

pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: Client,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            bot_token,
            chat_id,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, item: &ContentItem) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = json!({
            "chat_id": self.chat_id,
            "text": item.notification_lines().join("\n"),
            "disable_web_page_preview": false,
        });

        let payload: serde_json::Value = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(10))
            .json(&body)
            .send()
            .await
            .context("telegram post")?
            .error_for_status()
            .context("telegram non-2xx")?
            .json()
            .await
            .context("telegram response body")?;

        if !payload.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Err(anyhow!("telegram api error: {payload}"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
