//! Webhook notifier.
//!
//! Posts `{destination, message}` to a configured endpoint. Delivery is
//! fire-and-forget from the engine's point of view; the endpoint owns
//! retries and transport details.

use async_trait::async_trait;
use serde::Serialize;

use crate::infra::{EngineError, Notifier, Result};

/// Notifier configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Webhook endpoint to post messages to
    pub endpoint: String,
}

impl NotifierConfig {
    /// Load from `NOTIFY_WEBHOOK_URL`; absent means notifications are off
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("NOTIFY_WEBHOOK_URL").ok()?;
        Some(Self { endpoint })
    }
}

#[derive(Serialize)]
struct NotifyPayload<'a> {
    destination: &'a str,
    message: &'a str,
}

/// HTTP webhook implementation of [`Notifier`]
pub struct WebhookNotifier {
    config: NotifierConfig,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, destination: &str, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&NotifyPayload {
                destination,
                message,
            })
            .send()
            .await
            .map_err(|e| EngineError::external("notify", true, e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::external(
                "notify",
                response.status().is_server_error(),
                format!("webhook returned {}", response.status()),
            ));
        }
        Ok(())
    }
}
