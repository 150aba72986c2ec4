//! Rate-limited health probing.
//!
//! # Responsibilities
//! - Probe one backend with a cheap count query
//! - Cache the result for `check_interval_floor`
//! - Record failures observed by in-flight calls
//!
//! # Design Decisions
//! - Probing is lazy: it runs inline with the call that needs it, never on
//!   a background timer
//! - The probe slot is claimed with a compare-and-set on the last-check
//!   timestamp, so concurrent callers issue at most one probe per interval
//! - Probe errors are folded into `Unhealthy` and never returned
//! - A failure recorded during a health check wins over that check's
//!   result

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

use crate::health::state::{HealthState, HealthStatus, Probe};
use crate::observability::logging::unix_millis;
use crate::observability::metrics;
use crate::resilience::with_timeout;
use crate::router::BackendDescriptor;
use crate::store::StoreError;

const NEVER: u64 = u64::MAX;

/// Health monitor for a single backend.
#[derive(Debug)]
pub struct HealthMonitor {
    descriptor: BackendDescriptor,
    check_interval_floor: Duration,
    probe_timeout: Duration,
    /// Reference point for `last_checked_ms`.
    epoch: Instant,
    /// Milliseconds after `epoch` of the last check, or `NEVER`.
    last_checked_ms: AtomicU64,
    /// Current state (0=Unknown, 1=Healthy, 2=Unhealthy).
    state: AtomicU8,
    probes: AtomicU64,
    /// Bumped by every `record_failure`.
    failures: AtomicU64,
    /// Serializes writes of `state` and `last_checked_ms`.
    commit: Mutex<()>,
}

impl HealthMonitor {
    pub fn new(
        descriptor: BackendDescriptor,
        check_interval_floor: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            descriptor,
            check_interval_floor,
            probe_timeout,
            epoch: Instant::now(),
            last_checked_ms: AtomicU64::new(NEVER),
            state: AtomicU8::new(HealthState::Unknown as u8),
            probes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            commit: Mutex::new(()),
        }
    }

    pub fn descriptor(&self) -> &BackendDescriptor {
        &self.descriptor
    }

    /// Last known state, without probing.
    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Acquire))
    }

    /// Ask the backend whether it is reachable.
    ///
    /// Returns the cached state when the backend is unconfigured, when the
    /// last check is younger than the interval floor, or when another
    /// caller won the claim for this interval.
    pub async fn probe(&self) -> Probe {
        let role = self.descriptor.role();

        if let Err(e) = self.descriptor.ensure_configured() {
            tracing::trace!(role = %role, error = %e, "Probe skipped");
            self.state
                .store(HealthState::Unhealthy as u8, Ordering::Release);
            return Probe {
                state: HealthState::Unhealthy,
                performed: false,
            };
        }

        if !self.claim() {
            return Probe {
                state: self.state(),
                performed: false,
            };
        }

        self.probes.fetch_add(1, Ordering::Relaxed);
        let failures_before = self.failures.load(Ordering::Acquire);
        let result = with_timeout(self.probe_timeout, self.descriptor.store().count_users()).await;
        let healthy = match &result {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(role = %role, error = %e, "Health probe failed");
                false
            }
        };

        let state = if healthy {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };
        {
            let _commit = self.lock_commit();
            if self.failures.load(Ordering::Acquire) != failures_before {
                tracing::debug!(
                    role = %role,
                    healthy,
                    "Health check superseded by a recorded failure"
                );
                return Probe {
                    state: self.state(),
                    performed: true,
                };
            }
            self.state.store(state as u8, Ordering::Release);
            self.last_checked_ms.store(self.elapsed_ms(), Ordering::Release);
        }

        tracing::debug!(
            event = "health-check",
            role = %role,
            healthy,
            timestamp = unix_millis(SystemTime::now()),
            "Health check completed"
        );
        metrics::record_backend_health(role, healthy);

        Probe {
            state,
            performed: true,
        }
    }

    /// Record a connectivity failure seen by an in-flight call.
    ///
    /// Counts as a check: the next real probe is at least one interval away.
    pub fn record_failure(&self, error: &StoreError) {
        {
            let _commit = self.lock_commit();
            self.failures.fetch_add(1, Ordering::AcqRel);
            self.state
                .store(HealthState::Unhealthy as u8, Ordering::Release);
            self.last_checked_ms.store(self.elapsed_ms(), Ordering::Release);
        }
        tracing::debug!(role = %self.descriptor.role(), error = %error, "Backend failure observed");
        metrics::record_backend_health(self.descriptor.role(), false);
    }

    /// Snapshot for reporting.
    pub fn status(&self) -> HealthStatus {
        let last = self.last_checked_ms.load(Ordering::Acquire);
        let last_checked_ago = (last != NEVER)
            .then(|| Duration::from_millis(self.elapsed_ms().saturating_sub(last)));

        HealthStatus {
            role: self.descriptor.role(),
            configured: self.descriptor.is_configured(),
            state: self.state(),
            last_checked_ago,
            check_interval_floor: self.check_interval_floor,
            probes: self.probes.load(Ordering::Relaxed),
        }
    }

    /// Claim the probe slot for the current interval.
    fn claim(&self) -> bool {
        let now = self.elapsed_ms();
        let last = self.last_checked_ms.load(Ordering::Acquire);
        let floor = u64::try_from(self.check_interval_floor.as_millis()).unwrap_or(u64::MAX);

        if last != NEVER && now.saturating_sub(last) < floor {
            return false;
        }

        // The loser of a race keeps the cached state.
        self.last_checked_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn lock_commit(&self) -> MutexGuard<'_, ()> {
        self.commit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}
