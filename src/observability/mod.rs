//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! health/monitor.rs, failover/events.rs, router/executor.rs produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Failover events at info, health checks at debug (they are rate
//!   limited but still frequent)
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
