use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::notification::ChannelKind;
use crate::roster::PersonId;

pub type AlertId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        }
    }

    /// Parses without rejecting unrecognised values.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Severity::Unknown)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; unrecognised values become `Unknown`.
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Severity::parse_lenient(&raw))
    }
}

impl FromStr for Severity {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(crate::Error::Validation(format!("Invalid severity: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

/// One delivery attempt to one responder over one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub method: ChannelKind,
    pub recipient: PersonId,
    pub sent_at: DateTime<Utc>,
    pub status: NotificationStatus,
    pub escalation_level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The alert was already in the requested state
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub source: String,
    pub created_at: DateTime<Utc>,

    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,

    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,

    pub escalation_level: u32,
    /// Schedule the alert was routed to, once routing has run
    pub schedule_id: Option<String>,
    pub notifications: Vec<NotificationRecord>,
}

impl Alert {
    pub fn new(
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
        source: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            severity,
            title: title.into(),
            description: description.into(),
            source: source.into(),
            created_at,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            escalation_level: 1,
            schedule_id: None,
            notifications: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.resolved
    }

    /// A handled alert no longer escalates.
    pub fn is_handled(&self) -> bool {
        self.acknowledged || self.resolved
    }

    pub fn acknowledge(&mut self, by: &str, at: DateTime<Utc>) -> Transition {
        if self.acknowledged {
            return Transition::Unchanged;
        }
        self.acknowledged = true;
        self.acknowledged_by = Some(by.to_string());
        self.acknowledged_at = Some(at);
        Transition::Applied
    }

    /// Resolving implies acknowledging.
    pub fn resolve(&mut self, by: &str, at: DateTime<Utc>) -> Transition {
        if self.resolved {
            return Transition::Unchanged;
        }
        self.acknowledge(by, at);
        self.resolved = true;
        self.resolved_by = Some(by.to_string());
        self.resolved_at = Some(at);
        Transition::Applied
    }

    /// Moves to `level` only if it is the next rung and nobody has acted yet.
    pub fn advance_escalation(&mut self, level: u32) -> bool {
        if self.is_handled() || level != self.escalation_level + 1 {
            return false;
        }
        self.escalation_level = level;
        true
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        self.resolved_at
            .map(|resolved_at| (resolved_at - self.created_at).num_minutes())
    }
}
