//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap every store call and probe with a deadline
//! - Turn an elapsed deadline into a connectivity-class error
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - A timeout is indistinguishable from an unreachable backend for
//!   failover purposes

use std::future::Future;
use std::time::Duration;

use crate::store::{StoreError, StoreResult};

/// Run `call` with a deadline of `limit`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
