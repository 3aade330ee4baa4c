//! Process-wide entry point wiring roster, alert storage, notifications and
//! the escalation engine together.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    alert::{Alert, AlertFilter, AlertId, AlertRepository, InMemoryAlertRepository, LifecycleOutcome, Severity, Transition},
    config::Config,
    escalation::EscalationEngine,
    hooks::{LifecycleEvent, LifecycleHook, WebhookHook},
    metrics,
    notification::{channels::WebhookChannel, MessageRenderer, NotificationDispatcher},
    roster::{OnCallPerson, Roster},
    rotation::RotationCalculator,
    Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRotation {
    pub current: OnCallPerson,
    pub next: OnCallPerson,
    pub handoff_time: DateTime<Utc>,
}

pub struct OnCallManager {
    roster: Arc<Roster>,
    repository: Arc<dyn AlertRepository>,
    engine: Arc<EscalationEngine>,
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl OnCallManager {
    pub fn new(
        roster: Arc<Roster>,
        repository: Arc<dyn AlertRepository>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        let engine = Arc::new(EscalationEngine::new(
            Arc::clone(&repository),
            Arc::clone(&roster),
            dispatcher,
        ));
        Self {
            roster,
            repository,
            engine,
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Loads the roster and builds the delivery stack described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let roster = Roster::from_file(&config.roster.path)?;
        info!(
            path = %config.roster.path.display(),
            people = roster.people().count(),
            schedules = roster.schedules().count(),
            "Roster loaded"
        );

        let renderer = MessageRenderer::new(
            roster.notification_template(),
            config.notifications.ack_base_url.clone(),
        )?;

        let mut dispatcher = NotificationDispatcher::new(renderer, config.notifications.send_timeout());
        for (kind, url) in &config.notifications.channel_webhooks {
            info!(channel = %kind, url = %url, "Using notification gateway");
            dispatcher = dispatcher.with_channel(*kind, Arc::new(WebhookChannel::new(*kind, url.clone())));
        }
        let dispatcher = dispatcher.with_log_fallback();

        let mut manager = Self::new(
            Arc::new(roster),
            Arc::new(InMemoryAlertRepository::new()),
            Arc::new(dispatcher),
        );
        if let Some(url) = &config.notifications.incident_webhook_url {
            manager = manager.with_hook(Arc::new(WebhookHook::new(url.clone())));
        }
        Ok(manager)
    }

    pub async fn create_alert(
        &self,
        severity: Severity,
        title: &str,
        description: &str,
        source: &str,
    ) -> Result<AlertId> {
        self.create_alert_at(severity, title, description, source, Utc::now())
            .await
    }

    /// Stores the alert and starts escalation. Routing problems are logged;
    /// the alert is still kept and its id returned.
    pub async fn create_alert_at(
        &self,
        severity: Severity,
        title: &str,
        description: &str,
        source: &str,
        created_at: DateTime<Utc>,
    ) -> Result<AlertId> {
        let alert = Alert::new(severity, title, description, source, created_at);
        let id = alert.id;
        self.repository.insert(alert.clone()).await?;

        metrics::record_alert_created(severity);
        info!(alert_id = %id, severity = %severity, title, source, "Alert created");

        if let Err(e) = self.engine.process_alert(&alert).await {
            error!(alert_id = %id, error = %e, "Alert will not be escalated");
        }
        Ok(id)
    }

    /// `false` when the alert does not exist. Acknowledging twice succeeds
    /// but keeps the first acknowledger.
    pub async fn acknowledge_alert(&self, id: AlertId, by: &str) -> bool {
        match self.repository.acknowledge(id, by, Utc::now()).await {
            Ok(Some(outcome)) => {
                self.engine.cancel(id);
                if outcome.transition == Transition::Applied {
                    info!(alert_id = %id, by, "Alert acknowledged");
                    metrics::ALERTS_ACKNOWLEDGED_TOTAL.inc();
                    self.emit(LifecycleEvent::acknowledged(&outcome.alert));
                }
                true
            }
            Ok(None) => {
                warn!(alert_id = %id, "Acknowledge requested for unknown alert");
                false
            }
            Err(e) => {
                error!(alert_id = %id, error = %e, "Failed to acknowledge alert");
                false
            }
        }
    }

    /// `false` when the alert does not exist. Resolving also acknowledges.
    pub async fn resolve_alert(&self, id: AlertId, by: &str) -> bool {
        match self.repository.resolve(id, by, Utc::now()).await {
            Ok(Some(LifecycleOutcome { transition, alert })) => {
                self.engine.cancel(id);
                if transition == Transition::Applied {
                    info!(
                        alert_id = %id,
                        by,
                        duration_minutes = alert.duration_minutes().unwrap_or_default(),
                        "Alert resolved"
                    );
                    metrics::ALERTS_RESOLVED_TOTAL.inc();
                    self.emit(LifecycleEvent::resolved(&alert));
                }
                true
            }
            Ok(None) => {
                warn!(alert_id = %id, "Resolve requested for unknown alert");
                false
            }
            Err(e) => {
                error!(alert_id = %id, error = %e, "Failed to resolve alert");
                false
            }
        }
    }

    pub fn get_current_on_call(&self, schedule_id: &str) -> Option<OnCallPerson> {
        self.get_current_on_call_at(schedule_id, Utc::now())
    }

    pub fn get_current_on_call_at(&self, schedule_id: &str, at: DateTime<Utc>) -> Option<OnCallPerson> {
        let Some(schedule) = self.roster.schedule(schedule_id) else {
            warn!(schedule_id, "Schedule not found");
            return None;
        };
        let Some(person_id) = RotationCalculator::current_on_call(schedule, at) else {
            warn!(schedule_id, "Schedule has no rotation members");
            return None;
        };
        self.lookup(person_id)
    }

    pub fn get_next_rotation(&self, schedule_id: &str) -> Option<NextRotation> {
        self.get_next_rotation_at(schedule_id, Utc::now())
    }

    pub fn get_next_rotation_at(&self, schedule_id: &str, at: DateTime<Utc>) -> Option<NextRotation> {
        let Some(schedule) = self.roster.schedule(schedule_id) else {
            warn!(schedule_id, "Schedule not found");
            return None;
        };
        let handoff = RotationCalculator::next_rotation(schedule, at)?;
        Some(NextRotation {
            current: self.lookup(&handoff.current)?,
            next: self.lookup(&handoff.next)?,
            handoff_time: handoff.handoff_time,
        })
    }

    /// Every alert not yet resolved, oldest first.
    pub async fn get_active_alerts(&self) -> Vec<Alert> {
        self.repository
            .list(AlertFilter::Unresolved)
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to list alerts");
                Vec::new()
            })
    }

    pub async fn get_alert(&self, id: AlertId) -> Option<Alert> {
        self.repository.get(id).await.unwrap_or_else(|e| {
            error!(alert_id = %id, error = %e, "Failed to load alert");
            None
        })
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn engine(&self) -> &Arc<EscalationEngine> {
        &self.engine
    }

    fn lookup(&self, person_id: &str) -> Option<OnCallPerson> {
        let person = self.roster.person(person_id).cloned();
        if person.is_none() {
            warn!(person_id, "Person not found in roster");
        }
        person
    }

    fn emit(&self, event: Option<LifecycleEvent>) {
        let Some(event) = event else { return };
        for hook in &self.hooks {
            let hook = Arc::clone(hook);
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = hook.on_event(&event).await {
                    warn!(error = %e, "Lifecycle hook failed");
                }
            });
        }
    }
}

impl Drop for OnCallManager {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}
