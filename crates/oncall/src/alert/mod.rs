mod memory;
mod models;

pub use memory::InMemoryAlertRepository;
pub use models::{Alert, AlertId, NotificationRecord, NotificationStatus, Severity, Transition};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFilter {
    All,
    Unresolved,
}

/// Result of an acknowledge/resolve request against the repository.
#[derive(Debug, Clone)]
pub struct LifecycleOutcome {
    pub transition: Transition,
    pub alert: Alert,
}

#[derive(Debug, Clone)]
pub enum EscalationUpdate {
    Advanced(Alert),
    /// Acknowledged, resolved, or already past the requested level
    Halted,
    Missing,
}

/// Storage for in-flight alerts.
///
/// Every mutating call is applied atomically per alert, so concurrent
/// acknowledge/resolve/escalate requests on one id serialize.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert(&self, alert: Alert) -> crate::Result<()>;
    async fn get(&self, id: AlertId) -> crate::Result<Option<Alert>>;
    async fn list(&self, filter: AlertFilter) -> crate::Result<Vec<Alert>>;

    async fn acknowledge(&self, id: AlertId, by: &str, at: DateTime<Utc>) -> crate::Result<Option<LifecycleOutcome>>;
    async fn resolve(&self, id: AlertId, by: &str, at: DateTime<Utc>) -> crate::Result<Option<LifecycleOutcome>>;

    async fn advance_escalation(&self, id: AlertId, level: u32) -> crate::Result<EscalationUpdate>;
    async fn set_schedule(&self, id: AlertId, schedule_id: &str) -> crate::Result<()>;
    async fn append_notifications(&self, id: AlertId, records: Vec<NotificationRecord>) -> crate::Result<()>;
}
