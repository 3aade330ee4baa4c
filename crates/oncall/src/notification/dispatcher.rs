use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{
    channels::LogChannel, determine_notification_methods, ChannelError, ChannelKind,
    MessageRenderer, NotificationChannel, NotificationMessage,
};
use crate::{
    alert::{Alert, NotificationRecord, NotificationStatus, Severity},
    metrics,
    roster::OnCallPerson,
};

pub struct NotificationDispatcher {
    channels: HashMap<ChannelKind, Arc<dyn NotificationChannel>>,
    renderer: MessageRenderer,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(renderer: MessageRenderer, send_timeout: Duration) -> Self {
        Self {
            channels: HashMap::new(),
            renderer,
            send_timeout,
        }
    }

    /// Register the provider for one channel kind, replacing any existing one.
    pub fn with_channel(mut self, kind: ChannelKind, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.insert(kind, channel);
        self
    }

    /// Fill every kind without a provider with a [`LogChannel`].
    pub fn with_log_fallback(mut self) -> Self {
        for kind in ChannelKind::ALL {
            self.channels
                .entry(kind)
                .or_insert_with(|| Arc::new(LogChannel::new(kind)));
        }
        self
    }

    pub fn determine_notification_methods(&self, severity: Severity) -> Vec<ChannelKind> {
        determine_notification_methods(severity)
    }

    /// Notify one responder over every channel for the alert's severity.
    ///
    /// Failures are recorded, never propagated.
    pub async fn send_notifications(&self, alert: &Alert, person: &OnCallPerson, level: u32) -> Vec<NotificationRecord> {
        let methods = self.determine_notification_methods(alert.severity);

        let message = match self.renderer.render(alert, person, level) {
            Ok(message) => message,
            Err(e) => {
                error!(alert_id = %alert.id, error = %e, "Failed to render notification");
                return methods
                    .into_iter()
                    .map(|kind| record(kind, person, level, Err(ChannelError::Other(e.to_string()))))
                    .collect();
            }
        };

        let sends = methods.into_iter().map(|kind| {
            let message = &message;
            async move {
                let outcome = self.send_one(kind, person, message).await;
                match &outcome {
                    Ok(()) => debug!(alert_id = %alert.id, channel = %kind, recipient = %person.id, "Notification sent"),
                    Err(e) => error!(
                        alert_id = %alert.id,
                        channel = %kind,
                        recipient = %person.id,
                        error = %e,
                        "Failed to send notification"
                    ),
                }
                record(kind, person, level, outcome)
            }
        });

        join_all(sends).await
    }

    /// Notify every responder of an escalation level concurrently.
    pub async fn notify_level(&self, alert: &Alert, people: &[OnCallPerson], level: u32) -> Vec<NotificationRecord> {
        info!(
            alert_id = %alert.id,
            level,
            responders = people.len(),
            "Sending notifications for escalation level"
        );
        let per_person = join_all(
            people
                .iter()
                .map(|person| self.send_notifications(alert, person, level)),
        )
        .await;
        per_person.into_iter().flatten().collect()
    }

    async fn send_one(
        &self,
        kind: ChannelKind,
        person: &OnCallPerson,
        message: &NotificationMessage,
    ) -> Result<(), ChannelError> {
        let handle = person
            .contact
            .handle_for(kind)
            .ok_or_else(|| ChannelError::MissingContact {
                channel: kind,
                recipient: person.id.clone(),
            })?;
        let channel = self
            .channels
            .get(&kind)
            .ok_or(ChannelError::NotConfigured(kind))?;

        match tokio::time::timeout(self.send_timeout, channel.send(handle, message)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(self.send_timeout.as_secs())),
        }
    }
}

fn record(
    kind: ChannelKind,
    person: &OnCallPerson,
    level: u32,
    outcome: Result<(), ChannelError>,
) -> NotificationRecord {
    let (status, error) = match outcome {
        Ok(()) => (NotificationStatus::Sent, None),
        Err(e) => (NotificationStatus::Failed, Some(e.to_string())),
    };
    metrics::record_notification(kind, status);

    NotificationRecord {
        method: kind,
        recipient: person.id.clone(),
        sent_at: Utc::now(),
        status,
        escalation_level: level,
        error,
    }
}
