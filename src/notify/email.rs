use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::AsyncSmtpTransport;
use lettre::{AsyncTransport, Tokio1Executor};

use super::Notifier;
use crate::client::ContentItem;
use crate::config::EmailConfig;

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Build from config. Returns `Ok(None)` when required fields are
    /// absent; `Err` when present fields fail to parse.
    pub fn from_config(config: &EmailConfig) -> Result<Option<Self>> {
        let (Some(host), Some(username), Some(password), Some(from_addr)) = (
            config.smtp_host.as_deref(),
            config.username.as_deref(),
            config.password.as_deref(),
            config.from_addr.as_deref(),
        ) else {
            return Ok(None);
        };
        if config.to_addrs.is_empty() {
            return Ok(None);
        }

        let credentials = Credentials::new(username.to_string(), password.to_string());
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .context("invalid smtp host")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        let mailer = builder
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let from: Mailbox = from_addr.parse().context("invalid from_addr")?;
        let to = config
            .to_addrs
            .iter()
            .map(|addr| addr.parse().with_context(|| format!("invalid to_addr {addr}")))
            .collect::<Result<Vec<Mailbox>>>()?;

        Ok(Some(Self { mailer, from, to }))
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, item: &ContentItem) -> Result<()> {
        let subject = format!("{}更新: {}", item.category.label(), item.title);
        let body = item.notification_lines().join("\n");

        let mut builder = Message::builder().from(self.from.clone());
        for to in &self.to {
            builder = builder.to(to.clone());
        }
        let message = builder
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email")?;

        self.mailer.send(message).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
