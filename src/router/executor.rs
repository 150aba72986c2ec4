//! Operation executor.
//!
//! # Responsibilities
//! - Run the lazy health check before each call
//! - Send the call to the active store under a deadline
//! - On a primary connectivity failure: fail over and retry once on the fallback
//!
//! # Design Decisions
//! - At most two store invocations per logical operation
//! - Operation errors (not found, conflict, invalid) are returned as-is;
//!   the other store would reject the request the same way
//! - Successful results are returned untouched, with no logging

use futures_util::future::BoxFuture;
use std::time::Duration;

use crate::failover::{FailoverState, SwitchReason};
use crate::health::{HealthMonitor, HealthState};
use crate::observability::metrics;
use crate::resilience::with_timeout;
use crate::router::BackendDescriptor;
use crate::store::{Role, Store, StoreError, StoreResult};

/// Timing knobs for the executor and its health monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Minimum time between two real probes of the same store.
    pub check_interval: Duration,
    /// Deadline for one probe.
    pub probe_timeout: Duration,
    /// Deadline for one store call.
    pub operation_timeout: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(2),
            operation_timeout: Duration::from_secs(5),
        }
    }
}

/// Executes store calls against whichever store is active.
#[derive(Debug)]
pub struct OperationExecutor {
    primary: HealthMonitor,
    fallback: HealthMonitor,
    state: FailoverState,
    operation_timeout: Duration,
}

impl OperationExecutor {
    pub fn new(
        primary: BackendDescriptor,
        fallback: BackendDescriptor,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            primary: HealthMonitor::new(primary, settings.check_interval, settings.probe_timeout),
            fallback: HealthMonitor::new(fallback, settings.check_interval, settings.probe_timeout),
            state: FailoverState::new(),
            operation_timeout: settings.operation_timeout,
        }
    }

    pub fn state(&self) -> &FailoverState {
        &self.state
    }

    pub fn monitor(&self, role: Role) -> &HealthMonitor {
        match role {
            Role::Primary => &self.primary,
            Role::Fallback => &self.fallback,
        }
    }

    /// Run `call` against the active store.
    ///
    /// `call` may run twice: once on the primary and, after a connectivity
    /// failure, once on the fallback.
    pub async fn execute<'a, T, F>(&'a self, operation: &'static str, call: F) -> StoreResult<T>
    where
        F: Fn(&'a dyn Store) -> BoxFuture<'a, StoreResult<T>>,
    {
        self.reconcile().await;

        let active = self.state.active();
        let first = with_timeout(
            self.operation_timeout,
            call(self.monitor(active).descriptor().store()),
        )
        .await;

        let primary_error = match first {
            Ok(value) => return Ok(value),
            Err(e) if active == Role::Fallback || !e.is_connectivity() => {
                metrics::record_operation_error(operation, e.kind());
                return Err(e);
            }
            Err(e) => e,
        };

        self.primary.record_failure(&primary_error);
        self.state
            .transition(Role::Primary, Role::Fallback, SwitchReason::OperationError);
        tracing::warn!(
            operation,
            error = %primary_error,
            "Primary store unreachable, retrying on fallback"
        );

        match with_timeout(self.operation_timeout, call(self.fallback.descriptor().store())).await {
            Ok(value) => Ok(value),
            Err(fallback_error) if fallback_error.is_connectivity() => {
                metrics::record_operation_error(operation, "unavailable");
                tracing::error!(
                    operation,
                    error = %fallback_error,
                    "Fallback store unreachable after primary failure"
                );
                Err(StoreError::Unavailable {
                    primary: Box::new(primary_error),
                    fallback: Box::new(fallback_error),
                })
            }
            Err(fallback_error) => {
                metrics::record_operation_error(operation, fallback_error.kind());
                Err(fallback_error)
            }
        }
    }

    /// Pre-call hook: act on a fresh probe of the primary.
    ///
    /// Only a probe performed by this call can move the role; cached results
    /// were already acted on when they were fresh. An unconfigured primary
    /// is never probed, so it never moves the role.
    pub async fn reconcile(&self) {
        let probe = self.primary.probe().await;
        if !probe.performed {
            return;
        }

        match (self.state.active(), probe.state) {
            (Role::Fallback, HealthState::Healthy) => {
                self.state
                    .transition(Role::Fallback, Role::Primary, SwitchReason::Probe);
            }
            (Role::Primary, HealthState::Unhealthy) => {
                self.state
                    .transition(Role::Primary, Role::Fallback, SwitchReason::Probe);
            }
            _ => {}
        }
    }
}
