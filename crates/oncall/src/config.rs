use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::notification::ChannelKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub roster: RosterSource,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSource {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Upper bound on a single channel send
    pub send_timeout_secs: u64,

    /// Chat incident channel notified on acknowledge/resolve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_webhook_url: Option<String>,

    /// Base URL embedded in acknowledge/resolve instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_base_url: Option<String>,

    /// Delivery gateways keyed by channel; channels without one are logged only
    #[serde(default)]
    pub channel_webhooks: HashMap<ChannelKind, String>,
}

impl NotificationConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: 30,
            incident_webhook_url: None,
            ack_base_url: None,
            channel_webhooks: HashMap::new(),
        }
    }
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Config {
            server: ServerConfig {
                addr: std::env::var("SERVER_ADDR")
                    .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            },
            roster: RosterSource {
                path: std::env::var("ROSTER_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("config/roster.yaml")),
            },
            notifications: NotificationConfig {
                send_timeout_secs: std::env::var("NOTIFICATION_SEND_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
                incident_webhook_url: std::env::var("INCIDENT_WEBHOOK_URL")
                    .ok()
                    .filter(|s| !s.is_empty()),
                ack_base_url: std::env::var("ACK_BASE_URL")
                    .ok()
                    .filter(|s| !s.is_empty()),
                channel_webhooks: ChannelKind::ALL
                    .into_iter()
                    .filter_map(|kind| {
                        std::env::var(channel_webhook_var(kind))
                            .ok()
                            .filter(|s| !s.is_empty())
                            .map(|url| (kind, url))
                    })
                    .collect(),
            },
        };

        config.validate()?;

        if config.notifications.incident_webhook_url.is_none() {
            tracing::info!("INCIDENT_WEBHOOK_URL is not set. Lifecycle webhook disabled.");
        }

        Ok(config)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.notifications.send_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "NOTIFICATION_SEND_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if let Some(url) = &self.notifications.incident_webhook_url {
            require_http("INCIDENT_WEBHOOK_URL", url)?;
        }
        for (kind, url) in &self.notifications.channel_webhooks {
            require_http(&channel_webhook_var(*kind), url)?;
        }
        Ok(())
    }
}

/// `NOTIFY_SMS_WEBHOOK_URL` and friends.
pub fn channel_webhook_var(kind: ChannelKind) -> String {
    format!("NOTIFY_{}_WEBHOOK_URL", kind.as_str().to_uppercase())
}

fn require_http(name: &str, raw: &str) -> crate::Result<()> {
    let parsed = Url::parse(raw)
        .map_err(|e| crate::Error::Config(format!("{} is not a valid URL '{}': {}", name, raw, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(crate::Error::Config(format!(
            "{} must be an http(s) URL, got '{}'",
            name, raw
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(crate::Error::Config(format!("{} has no host: '{}'", name, raw)));
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8080".to_string(),
            },
            roster: RosterSource {
                path: PathBuf::from("config/roster.yaml"),
            },
            notifications: NotificationConfig::default(),
        }
    }
}
