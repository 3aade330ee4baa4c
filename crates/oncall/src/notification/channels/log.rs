use async_trait::async_trait;
use tracing::info;

use crate::notification::{ChannelError, ChannelKind, NotificationChannel, NotificationMessage};

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone)]
pub struct LogChannel {
    kind: ChannelKind,
}

impl LogChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn send(&self, to: &str, message: &NotificationMessage) -> Result<(), ChannelError> {
        match self.kind {
            ChannelKind::Sms | ChannelKind::Phone => {
                info!(channel = %self.kind, to, "{}", message.short);
            }
            ChannelKind::Email | ChannelKind::Push => {
                info!(channel = %self.kind, to, subject = %message.subject, "{}", message.body);
            }
            ChannelKind::Slack => {
                info!(channel = %self.kind, to, "{}", message.body);
            }
        }
        Ok(())
    }
}
