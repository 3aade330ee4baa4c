use serde::Serialize;
use serde_json::json;

use crate::{alert::Alert, roster::OnCallPerson, template, Result};

pub const DEFAULT_TEMPLATE: &str = "\
Hi {{ .recipient }},

[{{ .alert.severity }}] {{ .alert.title }}

{{ .alert.description }}

Source: {{ .alert.source }}
Raised: {{ .alert.created_at }}
Alert ID: {{ .alert.id }}
Escalation level: {{ .level }}

{{ .instructions }}
";

/// Rendered notification content. Channels use the parts they support.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    /// Email subject / push title
    pub subject: String,
    /// Full text body
    pub body: String,
    /// Single-line form for SMS and voice
    pub short: String,
}

#[derive(Debug, Clone)]
pub struct MessageRenderer {
    template: String,
    ack_base_url: Option<String>,
}

impl MessageRenderer {
    pub fn new(template: Option<&str>, ack_base_url: Option<String>) -> Result<Self> {
        let template = template.unwrap_or(DEFAULT_TEMPLATE).to_string();
        template::validate_template(&template)?;
        Ok(Self {
            template,
            ack_base_url,
        })
    }

    pub fn instructions(&self, alert: &Alert) -> String {
        match &self.ack_base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                format!(
                    "Acknowledge: POST {base}/alerts/{id}/acknowledge\nResolve: POST {base}/alerts/{id}/resolve",
                    base = base,
                    id = alert.id
                )
            }
            None => format!(
                "Acknowledge or resolve alert {} to stop further escalation.",
                alert.id
            ),
        }
    }

    pub fn render(&self, alert: &Alert, person: &OnCallPerson, level: u32) -> Result<NotificationMessage> {
        let severity = alert.severity.as_str().to_uppercase();
        let context = json!({
            "alert": {
                "id": alert.id.to_string(),
                "severity": severity,
                "title": alert.title,
                "description": alert.description,
                "source": alert.source,
                "created_at": alert.created_at.to_rfc3339(),
            },
            "recipient": person.name,
            "level": level,
            "instructions": self.instructions(alert),
        });

        Ok(NotificationMessage {
            subject: format!("[{}] {}", severity, alert.title),
            body: template::render_template(&self.template, &context)?,
            short: format!(
                "[{}] {} ({}) - alert {}",
                severity, alert.title, alert.source, alert.id
            ),
        })
    }
}

impl Default for MessageRenderer {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            ack_base_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Severity;
    use crate::roster::{ContactInfo, Role};
    use chrono::Utc;

    fn person() -> OnCallPerson {
        OnCallPerson {
            id: "eng-1".to_string(),
            name: "Alice".to_string(),
            contact: ContactInfo::default(),
            timezone: "UTC".to_string(),
            role: Role::Engineer,
            skills: vec![],
            availability: None,
        }
    }

    #[test]
    fn test_default_template_contains_alert_details() {
        let alert = Alert::new(Severity::High, "API down", "5xx on /checkout", "health-monitor", Utc::now());
        let renderer = MessageRenderer::new(None, Some("https://oncall.example.com/".to_string())).unwrap();
        let message = renderer.render(&alert, &person(), 2).unwrap();

        assert_eq!(message.subject, "[HIGH] API down");
        assert!(message.body.contains("Hi Alice"));
        assert!(message.body.contains("5xx on /checkout"));
        assert!(message.body.contains("Source: health-monitor"));
        assert!(message.body.contains(&alert.id.to_string()));
        assert!(message.body.contains("Escalation level: 2"));
        assert!(message.body.contains(&format!(
            "https://oncall.example.com/alerts/{}/acknowledge",
            alert.id
        )));
        assert!(message.short.contains("API down"));
    }

    #[test]
    fn test_custom_template() {
        let alert = Alert::new(Severity::Low, "Cert expiring", "", "cron", Utc::now());
        let renderer = MessageRenderer::new(Some("{{ .alert.severity }}: {{ .alert.title }}"), None).unwrap();
        let message = renderer.render(&alert, &person(), 1).unwrap();
        assert_eq!(message.body, "LOW: Cert expiring");
    }

    #[test]
    fn test_broken_template_rejected() {
        assert!(MessageRenderer::new(Some("{% for %}"), None).is_err());
    }
}
