use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::{alert::NotificationStatus, alert::Severity, notification::ChannelKind};

lazy_static! {
    pub static ref ALERTS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oncall_alerts_created_total", "Total number of alerts created."),
        &["severity"]
    )
    .expect("valid metric definition");
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oncall_notifications_total", "Notification attempts by channel and outcome."),
        &["channel", "status"]
    )
    .expect("valid metric definition");
    pub static ref ESCALATIONS_TOTAL: IntCounter = IntCounter::new(
        "oncall_escalations_total",
        "Total number of escalations to a higher level."
    )
    .expect("valid metric definition");
    pub static ref MAX_ESCALATION_TOTAL: IntCounter = IntCounter::new(
        "oncall_max_escalation_total",
        "Alerts that exhausted their escalation ladder without being handled."
    )
    .expect("valid metric definition");
    pub static ref ALERTS_ACKNOWLEDGED_TOTAL: IntCounter = IntCounter::new(
        "oncall_alerts_acknowledged_total",
        "Total number of acknowledged alerts."
    )
    .expect("valid metric definition");
    pub static ref ALERTS_RESOLVED_TOTAL: IntCounter = IntCounter::new(
        "oncall_alerts_resolved_total",
        "Total number of resolved alerts."
    )
    .expect("valid metric definition");
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(ALERTS_CREATED_TOTAL.clone()),
            Box::new(NOTIFICATIONS_TOTAL.clone()),
            Box::new(ESCALATIONS_TOTAL.clone()),
            Box::new(MAX_ESCALATION_TOTAL.clone()),
            Box::new(ALERTS_ACKNOWLEDGED_TOTAL.clone()),
            Box::new(ALERTS_RESOLVED_TOTAL.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .expect("metric registered once");
        }
        registry
    };
}

pub fn record_alert_created(severity: Severity) {
    ALERTS_CREATED_TOTAL
        .with_label_values(&[severity.as_str()])
        .inc();
}

pub fn record_notification(channel: ChannelKind, status: NotificationStatus) {
    let status = match status {
        NotificationStatus::Sent => "sent",
        NotificationStatus::Failed => "failed",
    };
    NOTIFICATIONS_TOTAL
        .with_label_values(&[channel.as_str(), status])
        .inc();
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> crate::Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to convert metrics to string: {}", e)))
}
