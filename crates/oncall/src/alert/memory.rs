use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    alert::{
        Alert, AlertFilter, AlertId, AlertRepository, EscalationUpdate, LifecycleOutcome,
        NotificationRecord,
    },
    Error, Result,
};

/// Process-memory alert storage. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<HashMap<AlertId, Alert>>,
}

impl InMemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn insert(&self, alert: Alert) -> Result<()> {
        debug!("Saving alert: {}", alert.id);
        let mut alerts = self.alerts.write().await;
        if alerts.contains_key(&alert.id) {
            return Err(Error::Internal(format!("Alert {} already exists", alert.id)));
        }
        alerts.insert(alert.id, alert);
        Ok(())
    }

    async fn get(&self, id: AlertId) -> Result<Option<Alert>> {
        let alerts = self.alerts.read().await;
        Ok(alerts.get(&id).cloned())
    }

    async fn list(&self, filter: AlertFilter) -> Result<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        let mut listed: Vec<Alert> = alerts
            .values()
            .filter(|a| match filter {
                AlertFilter::All => true,
                AlertFilter::Unresolved => !a.resolved,
            })
            .cloned()
            .collect();
        listed.sort_by_key(|a| a.created_at);
        Ok(listed)
    }

    async fn acknowledge(&self, id: AlertId, by: &str, at: DateTime<Utc>) -> Result<Option<LifecycleOutcome>> {
        let mut alerts = self.alerts.write().await;
        Ok(alerts.get_mut(&id).map(|alert| LifecycleOutcome {
            transition: alert.acknowledge(by, at),
            alert: alert.clone(),
        }))
    }

    async fn resolve(&self, id: AlertId, by: &str, at: DateTime<Utc>) -> Result<Option<LifecycleOutcome>> {
        let mut alerts = self.alerts.write().await;
        Ok(alerts.get_mut(&id).map(|alert| LifecycleOutcome {
            transition: alert.resolve(by, at),
            alert: alert.clone(),
        }))
    }

    async fn advance_escalation(&self, id: AlertId, level: u32) -> Result<EscalationUpdate> {
        let mut alerts = self.alerts.write().await;
        Ok(match alerts.get_mut(&id) {
            Some(alert) => {
                if alert.advance_escalation(level) {
                    EscalationUpdate::Advanced(alert.clone())
                } else {
                    EscalationUpdate::Halted
                }
            }
            None => EscalationUpdate::Missing,
        })
    }

    async fn set_schedule(&self, id: AlertId, schedule_id: &str) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Alert {}", id)))?;
        alert.schedule_id = Some(schedule_id.to_string());
        Ok(())
    }

    async fn append_notifications(&self, id: AlertId, records: Vec<NotificationRecord>) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Alert {}", id)))?;
        alert.notifications.extend(records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{NotificationStatus, Severity, Transition};
    use crate::notification::ChannelKind;

    fn alert(title: &str) -> Alert {
        Alert::new(Severity::Medium, title, "", "test", Utc::now())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = InMemoryAlertRepository::new();
        let a = alert("one");
        let id = a.id;
        repo.insert(a.clone()).await.unwrap();
        assert_eq!(repo.get(id).await.unwrap(), Some(a.clone()));
        assert!(repo.insert(a).await.is_err());
        assert!(repo.get(AlertId::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_unresolved_filters_resolved() {
        let repo = InMemoryAlertRepository::new();
        let open = alert("open");
        let closed = alert("closed");
        let closed_id = closed.id;
        repo.insert(open.clone()).await.unwrap();
        repo.insert(closed).await.unwrap();
        repo.resolve(closed_id, "alice", Utc::now()).await.unwrap();

        let active = repo.list(AlertFilter::Unresolved).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, open.id);
        assert_eq!(repo.list(AlertFilter::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_acknowledge_unknown_alert_returns_none() {
        let repo = InMemoryAlertRepository::new();
        assert!(repo.acknowledge(AlertId::new_v4(), "alice", Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_acknowledge_twice_reports_unchanged() {
        let repo = InMemoryAlertRepository::new();
        let a = alert("ack");
        let id = a.id;
        repo.insert(a).await.unwrap();
        let first = repo.acknowledge(id, "alice", Utc::now()).await.unwrap().unwrap();
        assert_eq!(first.transition, Transition::Applied);
        let second = repo.acknowledge(id, "bob", Utc::now()).await.unwrap().unwrap();
        assert_eq!(second.transition, Transition::Unchanged);
        assert_eq!(second.alert.acknowledged_at, first.alert.acknowledged_at);
    }

    #[tokio::test]
    async fn test_advance_escalation_halts_after_acknowledge() {
        let repo = InMemoryAlertRepository::new();
        let a = alert("esc");
        let id = a.id;
        repo.insert(a).await.unwrap();

        assert!(matches!(repo.advance_escalation(id, 2).await.unwrap(), EscalationUpdate::Advanced(a) if a.escalation_level == 2));
        repo.acknowledge(id, "alice", Utc::now()).await.unwrap();
        assert!(matches!(repo.advance_escalation(id, 3).await.unwrap(), EscalationUpdate::Halted));
        assert!(matches!(repo.advance_escalation(AlertId::new_v4(), 2).await.unwrap(), EscalationUpdate::Missing));
    }

    #[tokio::test]
    async fn test_advance_escalation_rejects_skipped_level() {
        let repo = InMemoryAlertRepository::new();
        let a = alert("skip");
        let id = a.id;
        repo.insert(a).await.unwrap();

        assert!(matches!(repo.advance_escalation(id, 3).await.unwrap(), EscalationUpdate::Halted));
        assert_eq!(repo.get(id).await.unwrap().unwrap().escalation_level, 1);
        assert!(matches!(repo.advance_escalation(id, 2).await.unwrap(), EscalationUpdate::Advanced(_)));
        assert!(matches!(repo.advance_escalation(id, 2).await.unwrap(), EscalationUpdate::Halted));
        assert_eq!(repo.get(id).await.unwrap().unwrap().escalation_level, 2);
    }

    #[tokio::test]
    async fn test_append_notifications() {
        let repo = InMemoryAlertRepository::new();
        let a = alert("notify");
        let id = a.id;
        repo.insert(a).await.unwrap();
        let record = NotificationRecord {
            method: ChannelKind::Email,
            recipient: "eng-1".to_string(),
            sent_at: Utc::now(),
            status: NotificationStatus::Sent,
            escalation_level: 1,
            error: None,
        };
        repo.append_notifications(id, vec![record.clone()]).await.unwrap();
        repo.set_schedule(id, "primary-schedule").await.unwrap();
        let stored = repo.get(id).await.unwrap().unwrap();
        assert_eq!(stored.notifications, vec![record]);
        assert_eq!(stored.schedule_id.as_deref(), Some("primary-schedule"));
        assert!(repo.append_notifications(AlertId::new_v4(), vec![]).await.is_err());
    }
}
