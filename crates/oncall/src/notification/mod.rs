//! Notification fan-out to responders.
//!
//! Severity picks the set of channels; every (channel, responder) pair is
//! attempted independently and recorded as `sent` or `failed` on the alert.

pub mod channels;
mod dispatcher;
mod message;

pub use dispatcher::NotificationDispatcher;
pub use message::{MessageRenderer, NotificationMessage, DEFAULT_TEMPLATE};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::alert::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Phone,
    Sms,
    Email,
    Slack,
    Push,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Phone,
        ChannelKind::Sms,
        ChannelKind::Email,
        ChannelKind::Slack,
        ChannelKind::Push,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Phone => "phone",
            ChannelKind::Sms => "sms",
            ChannelKind::Email => "email",
            ChannelKind::Slack => "slack",
            ChannelKind::Push => "push",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channels used for a given severity, in delivery order.
pub fn determine_notification_methods(severity: Severity) -> Vec<ChannelKind> {
    use ChannelKind::*;
    match severity {
        Severity::Critical => vec![Phone, Sms, Email, Slack, Push],
        Severity::High => vec![Sms, Email, Slack, Push],
        Severity::Medium => vec![Email, Slack, Push],
        Severity::Low => vec![Email, Slack],
        Severity::Unknown => vec![Email],
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(ChannelKind),

    #[error("No {channel} contact for {recipient}")]
    MissingContact { channel: ChannelKind, recipient: String },

    #[error("Send timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// A delivery capability (email, SMS, voice, chat, push provider).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver `message` to the channel-specific handle `to`.
    async fn send(&self, to: &str, message: &NotificationMessage) -> Result<(), ChannelError>;
}
