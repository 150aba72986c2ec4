//! Failover subsystem.
//!
//! # Data Flow
//! ```text
//! router/executor.rs
//!     → probe result or primary connectivity failure
//!     → state.rs (compare-and-set transition)
//!     → events.rs (log, metrics, broadcast to subscribers)
//! ```
//!
//! # Design Decisions
//! - One active role per router; no per-operation routing
//! - Promotion back to the primary needs a successful probe, never
//!   optimism
//! - No reconciliation of data written while on the fallback

pub mod events;
pub mod state;

pub use events::{FailoverEvent, SwitchReason};
pub use state::{FailoverSnapshot, FailoverState};
