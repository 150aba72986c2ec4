//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → schema.rs apply_env (primary URL, admin key)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → StorageRouter::from_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; whether the primary is configured is
//!   fixed for the life of the process
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AdminConfig;
pub use schema::HealthCheckConfig;
pub use schema::ObservabilityConfig;
pub use schema::RouterConfig;
