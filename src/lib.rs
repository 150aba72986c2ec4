//! Resilient storage router for the property assessment service.
//!
//! Puts a primary (remote) store and a local fallback store behind one
//! [`Store`] contract, probes the primary lazily, and fails over when it
//! cannot be reached.

pub mod admin;
pub mod config;
pub mod failover;
pub mod health;
pub mod observability;
pub mod resilience;
pub mod router;
pub mod store;

pub use config::RouterConfig;
pub use router::StorageRouter;
pub use store::{Role, Store, StoreError, StoreResult};
