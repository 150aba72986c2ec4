//! Backend health state.
//!
//! # States
//! - Unknown: never probed
//! - Healthy: last probe reached the backend
//! - Unhealthy: last probe or in-flight call failed, or backend unconfigured
//!
//! # Design Decisions
//! - Stored as a single `AtomicU8` so readers never see a torn value
//! - A status snapshot is a plain value; it never borrows the monitor

use std::time::Duration;

use crate::store::Role;

/// Tri-state health.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Unknown => "unknown",
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
        }
    }
}

/// Outcome of a call to [`HealthMonitor::probe`](crate::health::HealthMonitor::probe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub state: HealthState,
    /// False when the result came from the cache (rate limit, lost claim)
    /// or from the unconfigured short-circuit.
    pub performed: bool,
}

impl Probe {
    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}

/// Point-in-time view of one backend's health.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub role: Role,
    pub configured: bool,
    pub state: HealthState,
    /// Time since the last probe or observed failure; `None` if never checked.
    pub last_checked_ago: Option<Duration>,
    pub check_interval_floor: Duration,
    /// Real probes issued since start.
    pub probes: u64,
}
