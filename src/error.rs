//! Error types for rune-compose

use thiserror::Error;

/// Result type for compose operations
pub type Result<T> = std::result::Result<T, ComposeError>;

/// Compose error types
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("The compose file does not have any services")]
    MissingServices,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Compose file parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
