//! Template rendering utilities using Tera
//!
//! Roster files may write notification templates in Go template syntax
//! (`{{ .alert.title }}`), which is converted to Tera before rendering.

use serde_json::Value;
use tera::{Context, Tera};

use crate::{Error, Result};

/// Convert Go template syntax to Tera syntax
///
/// Handles common patterns:
/// - {{ .path.to.value }} -> {{ path.to.value }}
/// - {{ .value | default "default" }} -> {{ value | default(value="default") }}
pub fn convert_go_to_tera(template: &str) -> String {
    let mut converted = template.replace("{{ .", "{{ ").replace("{{.", "{{");

    let patterns = [
        r#"\{\{([^}]+)\|\s*default\s+"([^"]+)"\s*\}\}"#,
        r#"\{\{([^}]+)\|\s*default\s+'([^']+)'\s*\}\}"#,
        r#"\{\{([^}]+)\|\s*default\s+([^}\s]+)\s*\}\}"#,
    ];
    for pattern in patterns {
        if let Ok(re) = regex::Regex::new(pattern) {
            converted = re
                .replace_all(&converted, "{{$1| default(value=\"$2\")}}")
                .to_string();
        }
    }

    converted
}

/// Render a template string with the given context
pub fn render_template(template: &str, context: &Value) -> Result<String> {
    let converted_template = convert_go_to_tera(template);

    let mut tera = Tera::default();
    tera.add_raw_template("template", &converted_template)
        .map_err(|e| Error::Template(format!("Failed to parse template: {}", e)))?;

    let mut tera_context = Context::new();
    match context {
        Value::Object(map) => {
            for (key, value) in map {
                tera_context.insert(key, &value);
            }
        }
        _ => {
            tera_context.insert("data", &context);
        }
    }

    tera.render("template", &tera_context)
        .map_err(|e| Error::Template(format!("Failed to render template: {}", e)))
}

/// Checks that a template parses, without rendering it.
pub fn validate_template(template: &str) -> Result<()> {
    let mut tera = Tera::default();
    tera.add_raw_template("template", &convert_go_to_tera(template))
        .map_err(|e| Error::Template(format!("Failed to parse template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_convert_go_to_tera() {
        let tests = vec![
            ("{{ .alert.title }}", "{{ alert.title }}"),
            ("{{.level}}", "{{level}}"),
            ("{{ .source | default \"unknown\" }}", "{{ source | default(value=\"unknown\")}}"),
            ("{{ .level | default 1 }}", "{{ level | default(value=\"1\")}}"),
        ];

        for (input, expected) in tests {
            assert_eq!(convert_go_to_tera(input), expected);
        }
    }

    #[test]
    fn test_render_template() {
        let context = json!({
            "alert": { "title": "Disk full", "severity": "HIGH" },
            "level": 2
        });

        let result = render_template("[{{ .alert.severity }}] {{ .alert.title }} (L{{ .level }})", &context).unwrap();
        assert_eq!(result, "[HIGH] Disk full (L2)");

        let result = render_template("Owner: {{ .owner | default \"nobody\" }}", &context).unwrap();
        assert_eq!(result, "Owner: nobody");
    }

    #[test]
    fn test_invalid_template_is_reported() {
        assert!(validate_template("{% if %}").is_err());
        assert!(validate_template("{{ .alert.title }}").is_ok());
    }
}
