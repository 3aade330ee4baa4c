pub mod alert;
pub mod config;
pub mod escalation;
pub mod hooks;
pub mod manager;
pub mod metrics;
pub mod notification;
pub mod roster;
pub mod rotation;
pub mod server;
pub mod template;

use thiserror::Error;

pub use alert::{Alert, AlertId, Severity};
pub use manager::OnCallManager;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Template error: {0}")]
    Template(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
