//! Responder registry and schedule configuration.
//!
//! The roster is declarative data loaded once at startup from a YAML or JSON
//! file and treated as read-only afterwards.

mod models;
mod routing;

pub use models::{
    Availability, ContactInfo, EscalationLevel, EscalationPolicy, OnCallPerson, OnCallSchedule,
    PersonId, Role, RotationPolicy, RotationType, TimeOfDay,
};
pub use routing::{RoutingPolicy, RoutingRule, PRIMARY_SCHEDULE, WEEKEND_SCHEDULE};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::{Error, Result};

/// On-disk roster layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterFile {
    #[serde(default)]
    pub people: Vec<OnCallPerson>,
    #[serde(default)]
    pub schedules: Vec<OnCallSchedule>,
    #[serde(default)]
    pub routing: RoutingPolicy,

    /// Overrides the built-in notification body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_template: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Roster {
    people: HashMap<PersonId, OnCallPerson>,
    schedules: HashMap<String, OnCallSchedule>,
    routing: RoutingPolicy,
    notification_template: Option<String>,
}

impl Roster {
    pub fn new(file: RosterFile) -> Result<Self> {
        let mut people = HashMap::with_capacity(file.people.len());
        for person in file.people {
            if people.contains_key(&person.id) {
                return Err(Error::Validation(format!("Duplicate person id '{}'", person.id)));
            }
            people.insert(person.id.clone(), person);
        }

        let mut schedules = HashMap::with_capacity(file.schedules.len());
        for schedule in file.schedules {
            validate_schedule(&schedule, &people)?;
            if schedules.contains_key(&schedule.id) {
                return Err(Error::Validation(format!("Duplicate schedule id '{}'", schedule.id)));
            }
            schedules.insert(schedule.id.clone(), schedule);
        }

        file.routing.validate()?;
        for schedule_id in file.routing.referenced_schedules() {
            if !schedules.contains_key(schedule_id) {
                warn!(
                    schedule_id,
                    "Routing policy references an unknown schedule; alerts routed there will not escalate"
                );
            }
        }

        Ok(Self {
            people,
            schedules,
            routing: file.routing,
            notification_template: file.notification_template,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading roster from {}", path.display());

        let raw = std::fs::read_to_string(path)?;
        let file: RosterFile = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&raw)?,
            _ => serde_yaml::from_str(&raw)?,
        };

        let roster = Self::new(file)?;
        info!(
            people = roster.people.len(),
            schedules = roster.schedules.len(),
            "Roster loaded"
        );
        Ok(roster)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        Self::new(serde_yaml::from_str(raw)?)
    }

    pub fn person(&self, id: &str) -> Option<&OnCallPerson> {
        self.people.get(id)
    }

    pub fn schedule(&self, id: &str) -> Option<&OnCallSchedule> {
        self.schedules.get(id)
    }

    pub fn people(&self) -> impl Iterator<Item = &OnCallPerson> {
        self.people.values()
    }

    pub fn schedules(&self) -> impl Iterator<Item = &OnCallSchedule> {
        self.schedules.values()
    }

    pub fn routing(&self) -> &RoutingPolicy {
        &self.routing
    }

    pub fn notification_template(&self) -> Option<&str> {
        self.notification_template.as_deref()
    }
}

fn validate_schedule(
    schedule: &OnCallSchedule,
    people: &HashMap<PersonId, OnCallPerson>,
) -> Result<()> {
    if schedule.rotation.duration_hours == 0 {
        return Err(Error::Validation(format!(
            "Schedule '{}' has a zero-length rotation",
            schedule.id
        )));
    }

    if schedule.members.is_empty() {
        warn!(schedule_id = %schedule.id, "Schedule has no rotation members");
    }
    for member in &schedule.members {
        if !people.contains_key(member) {
            return Err(Error::Validation(format!(
                "Schedule '{}' rotation references unknown person '{}'",
                schedule.id, member
            )));
        }
    }

    if schedule.escalation.levels.is_empty() {
        return Err(Error::Validation(format!(
            "Schedule '{}' has no escalation levels",
            schedule.id
        )));
    }

    for (idx, level) in schedule.escalation.levels.iter().enumerate() {
        let expected = idx as u32 + 1;
        if level.level != expected {
            return Err(Error::Validation(format!(
                "Schedule '{}' escalation levels must be numbered contiguously from 1 (found {} at position {})",
                schedule.id, level.level, expected
            )));
        }
        if level.members.is_empty() {
            return Err(Error::Validation(format!(
                "Schedule '{}' escalation level {} has no members",
                schedule.id, level.level
            )));
        }
        if let Some(unknown) = level.members.iter().find(|m| !people.contains_key(*m)) {
            return Err(Error::Validation(format!(
                "Schedule '{}' escalation level {} references unknown person '{}'",
                schedule.id, level.level, unknown
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = r#"
people:
  - id: eng-1
    name: Alice
    role: engineer
    contact: { email: alice@example.com, phone: "+15550001", slack: "@alice", push: u-alice }
  - id: eng-2
    name: Bob
    role: engineer
    contact: { email: bob@example.com }
  - id: mgr-1
    name: Carol
    role: manager
schedules:
  - id: primary-schedule
    name: Primary
    rotation: { type: weekly, duration: 168, handoffTime: "09:00" }
    members: [eng-1, eng-2]
    escalation:
      levels:
        - { level: 1, timeout: 5, members: [eng-1, eng-2] }
        - { level: 2, timeout: 15, members: [mgr-1] }
"#;

    #[test]
    fn test_roster_loads_from_yaml() {
        let roster = Roster::from_yaml_str(ROSTER).unwrap();
        assert_eq!(roster.people().count(), 3);
        let schedule = roster.schedule("primary-schedule").unwrap();
        assert_eq!(schedule.rotation.rotation_type, RotationType::Weekly);
        assert_eq!(schedule.escalation.max_level(), 2);
        assert_eq!(roster.person("eng-1").unwrap().contact.slack.as_deref(), Some("@alice"));
        assert_eq!(roster.routing(), &RoutingPolicy::default());
    }

    #[test]
    fn test_non_contiguous_levels_rejected() {
        let raw = ROSTER.replace("level: 2,", "level: 3,");
        let err = Roster::from_yaml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("contiguously"));
    }

    #[test]
    fn test_empty_level_rejected() {
        let raw = ROSTER.replace("members: [mgr-1]", "members: []");
        assert!(Roster::from_yaml_str(&raw).is_err());
    }

    #[test]
    fn test_unknown_member_rejected() {
        let raw = ROSTER.replace("members: [mgr-1]", "members: [ghost]");
        let err = Roster::from_yaml_str(&raw).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_duplicate_person_rejected() {
        let raw = ROSTER.replace("id: eng-2", "id: eng-1");
        assert!(Roster::from_yaml_str(&raw).is_err());
    }

    #[test]
    fn test_empty_rotation_members_allowed() {
        let raw = ROSTER.replace("members: [eng-1, eng-2]\n    escalation", "members: []\n    escalation");
        let roster = Roster::from_yaml_str(&raw).unwrap();
        assert!(roster.schedule("primary-schedule").unwrap().members.is_empty());
    }

    #[test]
    fn test_schedule_without_rotation_type_uses_first_member() {
        let raw = ROSTER.replace(
            "rotation: { type: weekly, duration: 168, handoffTime: \"09:00\" }",
            "rotation: { handoffTime: \"09:00\" }",
        );
        let roster = Roster::from_yaml_str(&raw).unwrap();
        let schedule = roster.schedule("primary-schedule").unwrap();
        assert_eq!(schedule.rotation.rotation_type, RotationType::Unspecified);
        assert_eq!(
            crate::rotation::RotationCalculator::current_on_call(schedule, chrono::Utc::now()),
            Some(&"eng-1".to_string())
        );
    }

    #[test]
    fn test_routing_rule_with_unrecognised_severity_rejected() {
        let raw = format!(
            "{}routing:\n  rules:\n    - {{ name: weekend, schedule: primary-schedule, days: [Sat], excludeSeverities: [sev1] }}\n",
            ROSTER
        );
        assert!(Roster::from_yaml_str(&raw).is_err());

        let raw = raw.replace("[sev1]", "[Critical]");
        let roster = Roster::from_yaml_str(&raw).unwrap();
        assert_eq!(
            roster.routing().rules[0].exclude_severities,
            vec![crate::alert::Severity::Critical]
        );
    }
}
