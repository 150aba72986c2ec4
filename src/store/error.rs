//! Store error taxonomy.
//!
//! Errors fall into two classes that the router treats differently:
//! - connectivity: the backend could not be reached (network, auth, timeout).
//!   These drive failover.
//! - operation: the backend was reached but rejected the request
//!   (missing row, uniqueness violation, invalid payload). The other backend
//!   would reject it the same way, so these never drive failover.

use std::time::Duration;
use thiserror::Error;

use crate::store::Role;

/// Errors returned by any [`Store`](crate::store::Store) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend has no usable configuration and was never attempted.
    #[error("{0} store is not configured")]
    NotConfigured(Role),

    /// Backend could not be reached.
    #[error("connectivity error: {0}")]
    Connectivity(String),

    /// Backend call exceeded its deadline.
    #[error("store call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Requested record does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Write violates a uniqueness or referential constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Payload rejected by validation.
    #[error("invalid input: {0}")]
    Invalid(String),

    /// Both primary and fallback failed to serve the request.
    #[error("both stores unavailable (primary: {primary}; fallback: {fallback})")]
    Unavailable {
        primary: Box<StoreError>,
        fallback: Box<StoreError>,
    },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for failures that say nothing about the request itself, only
    /// about reaching the backend. Only these may trigger failover.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            StoreError::NotConfigured(_)
                | StoreError::Connectivity(_)
                | StoreError::Timeout(_)
                | StoreError::Unavailable { .. }
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotConfigured(_) => "not_configured",
            StoreError::Connectivity(_) => "connectivity",
            StoreError::Timeout(_) => "timeout",
            StoreError::NotFound { .. } => "not_found",
            StoreError::Conflict(_) => "conflict",
            StoreError::Invalid(_) => "invalid",
            StoreError::Unavailable { .. } => "unavailable",
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(StoreError::Connectivity("refused".into()).is_connectivity());
        assert!(StoreError::Timeout(Duration::from_millis(50)).is_connectivity());
        assert!(StoreError::NotConfigured(Role::Primary).is_connectivity());

        assert!(!StoreError::Conflict("username taken".into()).is_connectivity());
        assert!(!StoreError::not_found("user", 7).is_connectivity());
        assert!(!StoreError::Invalid("sqft must be positive".into()).is_connectivity());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "store call timed out after 250ms");

        let err = StoreError::not_found("property", 42);
        assert_eq!(err.to_string(), "property 42 not found");

        let err = StoreError::NotConfigured(Role::Primary);
        assert_eq!(err.to_string(), "primary store is not configured");

        let err = StoreError::Unavailable {
            primary: Box::new(StoreError::Connectivity("reset".into())),
            fallback: Box::new(StoreError::Connectivity("disk".into())),
        };
        assert!(err.to_string().contains("reset"));
        assert!(err.to_string().contains("disk"));
    }
}
