//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Lazy probe (monitor.rs):
//!     Executor pre-call hook
//!     → interval floor elapsed? claim the slot
//!     → count query against the store, under timeout
//!     → update state.rs
//!
//! Passive observation (monitor.rs):
//!     In-flight call fails to reach the store
//!     → record_failure marks it unhealthy and restarts the window
//! ```
//!
//! # Design Decisions
//! - Health state is per-backend
//! - No background timer; probes ride on traffic
//! - Unconfigured backends are never contacted

pub mod monitor;
pub mod state;

pub use monitor::HealthMonitor;
pub use state::{HealthState, HealthStatus, Probe};
