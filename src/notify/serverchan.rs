use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;

use super::Notifier;
use crate::client::ContentItem;

pub struct ServerChanNotifier {
    sendkey: String,
    client: Client,
}

impl ServerChanNotifier {
    pub fn new(sendkey: String) -> Self {
        Self {
            sendkey,
            client: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for ServerChanNotifier {
    async fn send(&self, item: &ContentItem) -> Result<()> {
        let url = format!("https://sctapi.ftqq.com/{}.send", self.sendkey);
        let title = format!("{}更新: {}", item.category.label(), item.title);
        let desp = item.notification_lines().join("\n");

        let payload: serde_json::Value = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(10))
            .form(&[("title", title.as_str()), ("desp", desp.as_str())])
            .send()
            .await
            .context("serverchan post")?
            .error_for_status()
            .context("serverchan non-2xx")?
            .json()
            .await
            .context("serverchan response body")?;

        if payload.get("code").and_then(|v| v.as_i64()) != Some(0) {
            return Err(anyhow!("serverchan api error: {payload}"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "serverchan"
    }
}
