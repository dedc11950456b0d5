pub mod email;
pub mod serverchan;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, warn};

use crate::client::ContentItem;
use crate::config::Config;

/// A notification backend. Delivery is best-effort: callers log failures and
/// move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, item: &ContentItem) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Build every enabled, fully-configured backend; misconfigured ones are
/// skipped with a warning.
pub fn build_notifiers(config: &Config) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    let telegram = &config.notifications.telegram;
    if telegram.enabled {
        match (&telegram.bot_token, &telegram.chat_id) {
            (Some(token), Some(chat_id)) => notifiers.push(Box::new(
                telegram::TelegramNotifier::new(token.clone(), chat_id.clone()),
            )),
            _ => warn!("telegram notifier enabled but bot_token/chat_id missing"),
        }
    }

    let email = &config.notifications.email;
    if email.enabled {
        match email::EmailNotifier::from_config(email) {
            Ok(Some(notifier)) => notifiers.push(Box::new(notifier)),
            Ok(None) => warn!("email notifier enabled but required fields missing"),
            Err(err) => warn!(error = %err, "email notifier configuration invalid"),
        }
    }

    let serverchan = &config.notifications.serverchan;
    if serverchan.enabled {
        match &serverchan.sendkey {
            Some(sendkey) => notifiers.push(Box::new(serverchan::ServerChanNotifier::new(
                sendkey.clone(),
            ))),
            None => warn!("serverchan notifier enabled but sendkey missing"),
        }
    }

    notifiers
}

/// Fan an item out to every backend, logging failures and continuing.
pub async fn notify_all(notifiers: &[Box<dyn Notifier>], item: &ContentItem) {
    for notifier in notifiers {
        if let Err(err) = notifier.send(item).await {
            error!(
                notifier = notifier.name(),
                url = %item.url,
                error = %err,
                "notification failed"
            );
        }
    }
}
