//! Notification sinks for throttled alerts.

use std::future::Future;
use std::time::Duration;

use serde_json::json;
use tracing::warn;

use crate::config::AlertsConfig;
use crate::error::Result;

pub trait Notifier {
    fn notify(&self, message: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Posts `{"text": message}` to a Slack-style incoming webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&json!({ "text": message }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Used when no webhook is configured: the alert only reaches the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        warn!(alert = message, "alert threshold reached (no webhook configured)");
        Ok(())
    }
}

/// The sink selected by `alerts.webhook_url`.
#[derive(Debug, Clone)]
pub enum ConfiguredNotifier {
    Webhook(WebhookNotifier),
    Log(LogNotifier),
}

impl ConfiguredNotifier {
    pub fn from_config(cfg: &AlertsConfig) -> Result<Self> {
        match &cfg.webhook_url {
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(url.clone())?)),
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for ConfiguredNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        match self {
            Self::Webhook(n) => n.notify(message).await,
            Self::Log(n) => n.notify(message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn webhook_posts_text_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::Json(json!({ "text": "fetch failed" })))
            .with_status(200)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", server.url())).unwrap();
        notifier.notify("fetch failed").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn webhook_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/hook")
            .with_status(500)
            .create_async()
            .await;

        let notifier = WebhookNotifier::new(format!("{}/hook", server.url())).unwrap();
        assert!(notifier.notify("boom").await.is_err());
    }

    #[tokio::test]
    async fn configured_without_webhook_logs_only() {
        let notifier = ConfiguredNotifier::from_config(&AlertsConfig::default()).unwrap();
        assert!(matches!(notifier, ConfiguredNotifier::Log(_)));
        notifier.notify("quiet").await.unwrap();
    }
}
