use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::notification::{ChannelError, ChannelKind, NotificationChannel, NotificationMessage};

/// Delivers through an HTTP gateway by POSTing a JSON envelope.
pub struct WebhookChannel {
    kind: ChannelKind,
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    channel: ChannelKind,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    short: &'a str,
}

impl WebhookChannel {
    pub fn new(kind: ChannelKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, to: &str, message: &NotificationMessage) -> Result<(), ChannelError> {
        let payload = WebhookPayload {
            channel: self.kind,
            to,
            subject: &message.subject,
            body: &message.body,
            short: &message.short,
        };

        debug!(channel = %self.kind, url = %self.url, "Sending notification");

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            warn!(
                channel = %self.kind,
                status = %status,
                body = %body,
                "Notification gateway request failed"
            );

            Err(ChannelError::Other(format!("Gateway returned {}: {}", status, body)))
        }
    }
}
