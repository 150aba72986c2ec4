//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Store call or probe:
//!     → timeouts.rs (enforce per-call deadline)
//!     → On connectivity failure: router/executor.rs fails over and
//!       retries once on the fallback
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every store call has a deadline
//! - A single retry, on the other backend, never on the same one

pub mod timeouts;

pub use timeouts::with_timeout;
