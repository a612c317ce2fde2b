use thiserror::Error;

use crate::config::validators::EnvVarError;

#[derive(Error, Debug)]
pub enum ScaffoldError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid config value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Environment validation failed: {}", summarize(.errors))]
    EnvValidationError { errors: Vec<EnvVarError> },

    #[error("Cannot register '{key}': {reason}")]
    RegistrationError { key: String, reason: String },

    #[error("{resource} has no property '{property}'")]
    UnknownPropertyError { resource: String, property: String },

    #[error("{resource} property '{property}' is not numeric")]
    NotNumericError { resource: String, property: String },

    #[error("{value} is not a properly formatted ISO 8601 datetime string")]
    InvalidTimestampError { value: String },

    #[error("Unknown timezone: {name}")]
    InvalidTimezoneError { name: String },

    #[error("Record is not an instance of {resource}")]
    NotAnInstanceError { resource: String },

    #[error("{resource} does not allow undeclared property '{property}'")]
    SchemaViolationError { resource: String, property: String },

    #[error("Store error: {message}")]
    StoreError { message: String },
}

fn summarize(errors: &[EnvVarError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ScaffoldError>;
