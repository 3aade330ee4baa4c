use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::notification::ChannelKind;

pub type PersonId = String;

/// Wall-clock time of day written as `HH:MM` in roster files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay(pub NaiveTime);

impl TimeOfDay {
    pub fn parse(s: &str) -> crate::Result<Self> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(TimeOfDay)
            .map_err(|e| crate::Error::Validation(format!("Invalid time of day '{}': {}", s, e)))
    }

    pub fn midnight() -> Self {
        TimeOfDay(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeOfDay::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Engineer,
    Manager,
    Executive,
}

/// Per-channel handles for reaching a responder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Slack member handle used for direct messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<String>,

    /// Push notification user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push: Option<String>,
}

impl ContactInfo {
    pub fn handle_for(&self, kind: ChannelKind) -> Option<&str> {
        match kind {
            ChannelKind::Email => self.email.as_deref(),
            // Voice calls and SMS share the phone number
            ChannelKind::Phone | ChannelKind::Sms => self.phone.as_deref(),
            ChannelKind::Slack => self.slack.as_deref(),
            ChannelKind::Push => self.push.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub days: Vec<Weekday>,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnCallPerson {
    pub id: PersonId,
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub role: Role,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationType {
    Weekly,
    Daily,
    Monthly,
    /// Missing or unrecognised; the first member is always on call
    #[default]
    #[serde(other)]
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationPolicy {
    #[serde(rename = "type", default)]
    pub rotation_type: RotationType,

    /// Shift length in hours
    #[serde(rename = "duration", default = "default_duration_hours")]
    pub duration_hours: u32,

    #[serde(default = "TimeOfDay::midnight")]
    pub handoff_time: TimeOfDay,

    /// Weekday on which weekly rotations hand off
    #[serde(default = "default_handoff_day")]
    pub handoff_day: Weekday,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationLevel {
    pub level: u32,

    /// Minutes to wait for an acknowledgement before moving on
    #[serde(rename = "timeout")]
    pub timeout_minutes: u64,

    pub members: Vec<PersonId>,
}

impl EscalationLevel {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes.saturating_mul(60))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub levels: Vec<EscalationLevel>,
}

impl EscalationPolicy {
    pub fn level(&self, level: u32) -> Option<&EscalationLevel> {
        self.levels.iter().find(|l| l.level == level)
    }

    pub fn max_level(&self) -> u32 {
        self.levels.iter().map(|l| l.level).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnCallSchedule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub rotation: RotationPolicy,
    #[serde(default)]
    pub members: Vec<PersonId>,
    #[serde(default)]
    pub escalation: EscalationPolicy,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_duration_hours() -> u32 {
    168
}

fn default_handoff_day() -> Weekday {
    Weekday::Mon
}
