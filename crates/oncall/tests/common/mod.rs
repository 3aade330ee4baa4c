#![allow(dead_code)]

use async_trait::async_trait;
use oncall_engine::{
    alert::InMemoryAlertRepository,
    notification::{
        ChannelError, ChannelKind, MessageRenderer, NotificationChannel, NotificationDispatcher,
        NotificationMessage,
    },
    roster::Roster,
    OnCallManager,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ROSTER: &str = r#"
people:
  - id: e1
    name: Engineer One
    role: engineer
    contact: { email: e1@example.com, phone: "+15550001", slack: "@e1", push: push-e1 }
  - id: e2
    name: Engineer Two
    role: engineer
    contact: { email: e2@example.com, phone: "+15550002", slack: "@e2", push: push-e2 }
  - id: mgr
    name: Manager
    role: manager
    contact: { email: mgr@example.com, phone: "+15550003", slack: "@mgr", push: push-mgr }
  - id: exec
    name: Executive
    role: executive
    contact: { email: exec@example.com, phone: "+15550004", slack: "@exec", push: push-exec }
schedules:
  - id: primary-schedule
    name: Primary
    rotation: { type: weekly, handoffTime: "09:00" }
    members: [e1, e2]
    escalation:
      levels:
        - { level: 1, timeout: 5, members: [e1, e2] }
        - { level: 2, timeout: 15, members: [mgr] }
        - { level: 3, timeout: 30, members: [exec] }
  - id: weekend-schedule
    name: Weekend
    rotation: { type: daily, handoffTime: "09:00" }
    members: [e2, e1]
    escalation:
      levels:
        - { level: 1, timeout: 10, members: [e2] }
        - { level: 2, timeout: 20, members: [mgr] }
"#;

/// Captures every delivery as `(channel, handle)`.
pub struct RecordingChannel {
    kind: ChannelKind,
    sent: Arc<Mutex<Vec<(ChannelKind, String)>>>,
}

impl RecordingChannel {
    pub fn for_kind(kind: ChannelKind, sent: Arc<Mutex<Vec<(ChannelKind, String)>>>) -> Self {
        Self { kind, sent }
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, to: &str, _message: &NotificationMessage) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push((self.kind, to.to_string()));
        Ok(())
    }
}

pub fn manager() -> (OnCallManager, Arc<Mutex<Vec<(ChannelKind, String)>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = NotificationDispatcher::new(MessageRenderer::default(), Duration::from_secs(30));
    for kind in ChannelKind::ALL {
        dispatcher = dispatcher.with_channel(kind, Arc::new(RecordingChannel::for_kind(kind, sent.clone())));
    }

    let roster = Arc::new(Roster::from_yaml_str(ROSTER).unwrap());
    let manager = OnCallManager::new(roster, Arc::new(InMemoryAlertRepository::new()), Arc::new(dispatcher));
    (manager, sent)
}

/// Lets spawned timer and fan-out tasks run under paused time.
pub async fn settle() {
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

pub async fn advance_minutes(n: u64) {
    tokio::time::advance(Duration::from_secs(n * 60)).await;
    settle().await;
}
