use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::alert::Severity;

pub const PRIMARY_SCHEDULE: &str = "primary-schedule";
pub const WEEKEND_SCHEDULE: &str = "weekend-schedule";

/// Ordered schedule-selection rules; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingPolicy {
    #[serde(default = "default_schedule")]
    pub default_schedule: String,
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    pub name: String,
    pub schedule: String,

    /// Days (UTC) the rule applies on; empty means every day
    #[serde(default)]
    pub days: Vec<Weekday>,

    /// Severities the rule applies to; empty means all
    #[serde(default)]
    pub severities: Vec<Severity>,

    #[serde(default)]
    pub exclude_severities: Vec<Severity>,
}

impl RoutingRule {
    pub fn matches(&self, severity: Severity, at: DateTime<Utc>) -> bool {
        if !self.days.is_empty() && !self.days.contains(&at.weekday()) {
            return false;
        }
        if !self.severities.is_empty() && !self.severities.contains(&severity) {
            return false;
        }
        !self.exclude_severities.contains(&severity)
    }
}

impl RoutingPolicy {
    pub fn select(&self, severity: Severity, at: DateTime<Utc>) -> &str {
        self.rules
            .iter()
            .find(|rule| rule.matches(severity, at))
            .map(|rule| rule.schedule.as_str())
            .unwrap_or(self.default_schedule.as_str())
    }

    /// Rejects rules naming a severity that does not exist.
    pub fn validate(&self) -> crate::Result<()> {
        for rule in &self.rules {
            let mut listed = rule.severities.iter().chain(&rule.exclude_severities);
            if listed.any(|s| *s == Severity::Unknown) {
                return Err(crate::Error::Validation(format!(
                    "Routing rule '{}' lists an unrecognised severity",
                    rule.name
                )));
            }
        }
        Ok(())
    }

    pub fn referenced_schedules(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.default_schedule.as_str())
            .chain(self.rules.iter().map(|r| r.schedule.as_str()))
    }
}

impl Default for RoutingPolicy {
    /// Weekend alerts go to the weekend rotation unless they are critical.
    fn default() -> Self {
        Self {
            default_schedule: default_schedule(),
            rules: vec![RoutingRule {
                name: "weekend".to_string(),
                schedule: WEEKEND_SCHEDULE.to_string(),
                days: vec![Weekday::Sat, Weekday::Sun],
                severities: vec![],
                exclude_severities: vec![Severity::Critical],
            }],
        }
    }
}

fn default_schedule() -> String {
    PRIMARY_SCHEDULE.to_string()
}
