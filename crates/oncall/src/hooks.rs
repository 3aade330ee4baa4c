//! Outbound notifications for acknowledge and resolve events, e.g. an
//! incident channel in team chat.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    alert::{Alert, AlertId},
    Error, Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Acknowledged {
        alert_id: AlertId,
        title: String,
        by: String,
        at: DateTime<Utc>,
    },
    Resolved {
        alert_id: AlertId,
        title: String,
        by: String,
        at: DateTime<Utc>,
        duration_minutes: i64,
    },
}

impl LifecycleEvent {
    pub fn acknowledged(alert: &Alert) -> Option<Self> {
        Some(LifecycleEvent::Acknowledged {
            alert_id: alert.id,
            title: alert.title.clone(),
            by: alert.acknowledged_by.clone()?,
            at: alert.acknowledged_at?,
        })
    }

    pub fn resolved(alert: &Alert) -> Option<Self> {
        Some(LifecycleEvent::Resolved {
            alert_id: alert.id,
            title: alert.title.clone(),
            by: alert.resolved_by.clone()?,
            at: alert.resolved_at?,
            duration_minutes: alert.duration_minutes()?,
        })
    }

    /// One-line chat text.
    pub fn summary(&self) -> String {
        match self {
            LifecycleEvent::Acknowledged { alert_id, title, by, .. } => {
                format!("Alert acknowledged: {} ({}) by {}", title, alert_id, by)
            }
            LifecycleEvent::Resolved {
                alert_id,
                title,
                by,
                duration_minutes,
                ..
            } => format!(
                "Alert resolved: {} ({}) by {} after {} minutes",
                title, alert_id, by, duration_minutes
            ),
        }
    }
}

#[async_trait]
pub trait LifecycleHook: Send + Sync {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<()>;
}

/// Posts `{"text": ..., "event": ...}` to an incoming-webhook URL.
pub struct WebhookHook {
    url: String,
    client: reqwest::Client,
}

impl WebhookHook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn payload(event: &LifecycleEvent) -> serde_json::Value {
        json!({
            "text": event.summary(),
            "event": event,
        })
    }
}

#[async_trait]
impl LifecycleHook for WebhookHook {
    async fn on_event(&self, event: &LifecycleEvent) -> Result<()> {
        debug!(url = %self.url, "Posting lifecycle event");
        let response = self
            .client
            .post(&self.url)
            .json(&Self::payload(event))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(status = %status, "Incident webhook rejected lifecycle event");
            return Err(Error::Internal(format!("Incident webhook returned {}", status)));
        }
        Ok(())
    }
}
