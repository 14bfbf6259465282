//! Domain error types
//!
//! This module defines the error hierarchy for Custodian.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main Custodian error type
///
/// This is the primary error type used throughout the library. CLI commands
/// wrap it in `anyhow::Error` at the process boundary.
#[derive(Debug, Error)]
pub enum CustodianError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A rule or anonymizer line names an entity type with no registered descriptor
    #[error("Unknown entity type: {0}")]
    ClassResolution(String),

    /// A field name is not registered for its entity type
    #[error("Unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    /// Business-rule violation raised while anonymizing a record
    #[error("Domain error: {0}")]
    Domain(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl CustodianError {
    /// Short machine-friendly label for the error variant, used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            CustodianError::Configuration(_) => "configuration",
            CustodianError::ClassResolution(_) => "class_resolution",
            CustodianError::UnknownField { .. } => "unknown_field",
            CustodianError::Domain(_) => "domain",
            CustodianError::Validation(_) => "validation",
            CustodianError::Database(_) => "database",
            CustodianError::Notification(_) => "notification",
            CustodianError::Serialization(_) => "serialization",
            CustodianError::Io(_) => "io",
            CustodianError::Other(_) => "other",
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for CustodianError {
    fn from(err: std::io::Error) -> Self {
        CustodianError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CustodianError {
    fn from(err: serde_json::Error) -> Self {
        CustodianError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CustodianError {
    fn from(err: toml::de::Error) -> Self {
        CustodianError::Configuration(format!("TOML parse error: {err}"))
    }
}
