//! Drives an alert up its schedule's escalation ladder until someone acts.
//!
//! Each routed alert gets one timer task. The task sleeps for the current
//! level's timeout, re-reads the alert, and either advances to the next level
//! or stops. Acknowledge/resolve aborts the task through its handle; the
//! level advance itself is a conditional repository update, so a wake-up
//! that races an acknowledgement cannot move the alert.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{
    alert::{Alert, AlertId, AlertRepository, EscalationUpdate},
    metrics,
    notification::NotificationDispatcher,
    roster::{EscalationLevel, OnCallPerson, OnCallSchedule, Roster},
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    Escalated(u32),
    /// Acknowledged or resolved before the timer fired
    Handled,
    /// No further level exists; the alert stays active at this level
    Exhausted(u32),
    Missing,
}

pub struct EscalationEngine {
    repository: Arc<dyn AlertRepository>,
    roster: Arc<Roster>,
    dispatcher: Arc<NotificationDispatcher>,
    timers: Mutex<HashMap<AlertId, JoinHandle<()>>>,
}

impl EscalationEngine {
    pub fn new(
        repository: Arc<dyn AlertRepository>,
        roster: Arc<Roster>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            repository,
            roster,
            dispatcher,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Picks the schedule for an alert from the roster's routing policy,
    /// evaluated at the alert's creation time.
    pub fn determine_schedule(&self, alert: &Alert) -> Option<&OnCallSchedule> {
        let schedule_id = self
            .roster
            .routing()
            .select(alert.severity, alert.created_at);
        let schedule = self.roster.schedule(schedule_id);
        if schedule.is_none() {
            warn!(alert_id = %alert.id, schedule_id, "Schedule not found");
        }
        schedule
    }

    /// Routes a new alert, notifies level 1 and arms the escalation timer.
    pub async fn process_alert(self: &Arc<Self>, alert: &Alert) -> Result<()> {
        let schedule = self.determine_schedule(alert).ok_or_else(|| {
            Error::NotFound(format!("No schedule available for alert {}", alert.id))
        })?;
        if schedule.escalation.level(1).is_none() {
            return Err(Error::Config(format!(
                "Schedule '{}' has no first escalation level",
                schedule.id
            )));
        }

        info!(alert_id = %alert.id, schedule_id = %schedule.id, "Routing alert");
        self.repository.set_schedule(alert.id, &schedule.id).await?;

        self.send_to_escalation_level(alert, schedule, 1);
        self.arm(alert.id, schedule.id.clone());
        Ok(())
    }

    /// Spawns the fan-out for one level and returns without waiting on it.
    pub fn send_to_escalation_level(
        &self,
        alert: &Alert,
        schedule: &OnCallSchedule,
        level: u32,
    ) -> Option<JoinHandle<()>> {
        let Some(rung) = schedule.escalation.level(level) else {
            warn!(alert_id = %alert.id, schedule_id = %schedule.id, level, "Escalation level not found");
            return None;
        };
        let people = self.responders(schedule, rung);

        let dispatcher = Arc::clone(&self.dispatcher);
        let repository = Arc::clone(&self.repository);
        let alert = alert.clone();

        Some(tokio::spawn(async move {
            let records = dispatcher.notify_level(&alert, &people, level).await;
            if let Err(e) = repository.append_notifications(alert.id, records).await {
                error!(alert_id = %alert.id, error = %e, "Failed to record notifications");
            }
        }))
    }

    /// One timer wake-up: advance the alert to its next level if nobody has acted.
    pub async fn escalate(&self, alert_id: AlertId, schedule: &OnCallSchedule) -> Result<EscalationOutcome> {
        let Some(alert) = self.repository.get(alert_id).await? else {
            warn!(%alert_id, "Alert disappeared during escalation");
            return Ok(EscalationOutcome::Missing);
        };

        if alert.is_handled() {
            debug!(%alert_id, "Alert already handled, escalation stopped");
            return Ok(EscalationOutcome::Handled);
        }

        let next = alert.escalation_level + 1;
        if schedule.escalation.level(next).is_none() {
            warn!(
                %alert_id,
                level = alert.escalation_level,
                schedule_id = %schedule.id,
                "Max escalation level reached; alert needs manual intervention"
            );
            metrics::MAX_ESCALATION_TOTAL.inc();
            return Ok(EscalationOutcome::Exhausted(alert.escalation_level));
        }

        match self.repository.advance_escalation(alert_id, next).await? {
            EscalationUpdate::Advanced(alert) => {
                info!(%alert_id, level = next, "Escalating alert");
                metrics::ESCALATIONS_TOTAL.inc();
                self.send_to_escalation_level(&alert, schedule, next);
                Ok(EscalationOutcome::Escalated(next))
            }
            EscalationUpdate::Halted => Ok(EscalationOutcome::Handled),
            EscalationUpdate::Missing => Ok(EscalationOutcome::Missing),
        }
    }

    /// Stops the alert's timer. Returns whether one was running.
    pub fn cancel(&self, alert_id: AlertId) -> bool {
        match self.lock_timers().remove(&alert_id) {
            Some(handle) => {
                handle.abort();
                debug!(%alert_id, "Escalation timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.lock_timers().len()
    }

    pub fn has_timer(&self, alert_id: AlertId) -> bool {
        self.lock_timers().contains_key(&alert_id)
    }

    pub fn shutdown(&self) {
        for (_, handle) in self.lock_timers().drain() {
            handle.abort();
        }
    }

    fn arm(self: &Arc<Self>, alert_id: AlertId, schedule_id: String) {
        let engine = Arc::clone(self);
        // Held across spawn so the task cannot deregister before it is registered.
        let mut timers = self.lock_timers();
        let handle = tokio::spawn(async move {
            engine.run_ladder(alert_id, &schedule_id).await;
        });
        if let Some(previous) = timers.insert(alert_id, handle) {
            previous.abort();
        }
    }

    async fn run_ladder(&self, alert_id: AlertId, schedule_id: &str) {
        let Some(schedule) = self.roster.schedule(schedule_id) else {
            return;
        };

        let mut level = 1;
        while let Some(rung) = schedule.escalation.level(level) {
            tokio::time::sleep(rung.timeout()).await;
            debug!(%alert_id, level, "Escalation timer fired");

            match self.escalate(alert_id, schedule).await {
                Ok(EscalationOutcome::Escalated(next)) => level = next,
                Ok(_) => break,
                Err(e) => {
                    error!(%alert_id, error = %e, "Escalation failed");
                    break;
                }
            }
        }

        self.lock_timers().remove(&alert_id);
    }

    fn responders(&self, schedule: &OnCallSchedule, rung: &EscalationLevel) -> Vec<OnCallPerson> {
        rung.members
            .iter()
            .filter_map(|id| {
                let person = self.roster.person(id).cloned();
                if person.is_none() {
                    warn!(schedule_id = %schedule.id, person_id = %id, "Responder not found");
                }
                person
            })
            .collect()
    }

    fn lock_timers(&self) -> std::sync::MutexGuard<'_, HashMap<AlertId, JoinHandle<()>>> {
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
