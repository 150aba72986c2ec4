//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::router::ExecutorSettings;

/// Environment variable holding the primary store URL.
pub const PRIMARY_URL_ENV: &str = "STORE_ROUTER_PRIMARY_URL";

/// Environment variable holding the admin API key.
pub const ADMIN_KEY_ENV: &str = "STORE_ROUTER_ADMIN_KEY";

/// Placeholder admin key; refused when the admin surface is enabled.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the storage router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Primary (remote) store settings.
    pub primary: PrimaryConfig,

    /// Fallback (local) store settings.
    pub fallback: FallbackConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin status surface.
    pub admin: AdminConfig,
}

impl RouterConfig {
    /// Overlay settings taken from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(PRIMARY_URL_ENV) {
            if !url.trim().is_empty() {
                self.primary.url = Some(url);
            }
        }
        if let Ok(key) = std::env::var(ADMIN_KEY_ENV) {
            if !key.is_empty() {
                self.admin.api_key = key;
            }
        }
    }

    /// Timing settings for the router's executor.
    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            check_interval: Duration::from_secs(self.health_check.interval_secs),
            probe_timeout: Duration::from_millis(self.health_check.probe_timeout_ms),
            operation_timeout: Duration::from_millis(self.timeouts.operation_ms),
        }
    }
}

/// Primary store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrimaryConfig {
    /// Connection URL. Absent means the primary is unconfigured for the
    /// lifetime of the process.
    pub url: Option<String>,

    /// Label used in logs.
    pub label: String,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            url: None,
            label: "remote".to_string(),
        }
    }
}

impl PrimaryConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// Fallback store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FallbackConfig {
    /// JSON snapshot the local store loads at start and writes at shutdown.
    pub snapshot_path: Option<String>,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Minimum seconds between two probes of the same store.
    pub interval_secs: u64,

    /// Probe timeout in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            probe_timeout_ms: 2_000,
        }
    }
}

/// Timeout configuration for store calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for one store call in milliseconds.
    pub operation_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { operation_ms: 5_000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin status surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin endpoints.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
