//! Configuration validation.
//!
//! Collects every problem in a configuration so the operator can fix them in
//! one pass instead of restarting once per mistake.

use thiserror::Error;

use crate::config::{Config, MAX_PER_DESTINATION};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.bot_token().is_none() {
            errors.push(ValidationError::MissingField {
                field: "telegram.bot_token".into(),
            });
        }

        if !self.telegram.api_base.starts_with("http://")
            && !self.telegram.api_base.starts_with("https://")
        {
            errors.push(ValidationError::InvalidValue {
                field: "telegram.api_base".into(),
                reason: "must start with http:// or https://".into(),
            });
        }

        if self.telegram.allowed_users.is_empty() {
            errors.push(ValidationError::InvalidValue {
                field: "telegram.allowed_users".into(),
                reason: "no user could ever reach the bot; use [\"*\"] to allow everyone".into(),
            });
        }

        if self.telegram.session_idle_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "telegram.session_idle_secs".into(),
                reason: "must be at least 1".into(),
            });
        }

        let max = self.merge.max_per_destination;
        if max == 0 || max > MAX_PER_DESTINATION {
            errors.push(ValidationError::InvalidValue {
                field: "merge.max_per_destination".into(),
                reason: format!("must be between 1 and {MAX_PER_DESTINATION}, got {max}"),
            });
        }

        if self.merge.page_size == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "merge.page_size".into(),
                reason: "must be at least 1".into(),
            });
        }

        match self.observability.log_format.as_str() {
            "json" | "pretty" => {}
            other => errors.push(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("expected \"json\" or \"pretty\", got \"{other}\""),
            }),
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}
