//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals and timeouts > 0)
//! - Validate addresses and the primary URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{RouterConfig, PLACEHOLDER_ADMIN_KEY};

/// Longest accepted health check interval (one day).
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(raw) = config.primary.url.as_deref() {
        if !raw.trim().is_empty() {
            if let Err(e) = url::Url::parse(raw) {
                errors.push(ValidationError::new(
                    "primary.url",
                    format!("not a valid URL: {}", e),
                ));
            }
        }
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::new(
            "health_check.interval_secs",
            "must be greater than 0",
        ));
    } else if config.health_check.interval_secs > MAX_INTERVAL_SECS {
        errors.push(ValidationError::new(
            "health_check.interval_secs",
            format!("must be at most {}", MAX_INTERVAL_SECS),
        ));
    }
    if config.health_check.probe_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "health_check.probe_timeout_ms",
            "must be greater than 0",
        ));
    } else if config.health_check.probe_timeout_ms
        >= config.health_check.interval_secs.saturating_mul(1_000)
    {
        errors.push(ValidationError::new(
            "health_check.probe_timeout_ms",
            "must be shorter than the check interval",
        ));
    }
    if config.timeouts.operation_ms == 0 {
        errors.push(ValidationError::new(
            "timeouts.operation_ms",
            "must be greater than 0",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("not a socket address: {}", config.admin.bind_address),
            ));
        }
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be set when the admin surface is enabled",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
