//! Storage routing subsystem.
//!
//! # Data Flow
//! ```text
//! Caller → facade.rs (StorageRouter implements Store)
//!     → executor.rs
//!         → health/monitor.rs (lazy, rate-limited probe of the primary)
//!         → failover/state.rs (promote or demote on a fresh probe)
//!         → active descriptor.rs → Store call under timeout
//!         → on primary connectivity failure:
//!             failover/state.rs (demote) → retry once on fallback
//!     → result or typed error
//! ```
//!
//! # Design Decisions
//! - The router is an explicit object passed to its consumers, not a global
//! - Delegation is spelled out per operation; the compiler checks that the
//!   contract is covered
//! - Data written to one store while the other was active is not copied back

pub mod descriptor;
pub mod executor;
pub mod facade;

pub use descriptor::BackendDescriptor;
pub use executor::{ExecutorSettings, OperationExecutor};
pub use facade::StorageRouter;
