//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check value ranges and header validity.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeouts.copy_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "timeouts.copy_timeout_ms",
            "must be greater than zero",
        ));
    }

    if config.transport.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "transport.connect_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.transport.user_agent.trim().is_empty() {
        errors.push(ValidationError::new("transport.user_agent", "must not be empty"));
    } else if HeaderValue::from_str(&config.transport.user_agent).is_err() {
        errors.push(ValidationError::new(
            "transport.user_agent",
            "is not a valid header value",
        ));
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError::new("observability.log_level", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
