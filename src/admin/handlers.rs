use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::health::HealthStatus;
use crate::observability::logging::unix_millis;
use crate::store::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct RouterStatus {
    pub version: String,
    pub active_role: Role,
    /// Unix milliseconds of the last failover, if any.
    pub last_switched_at: Option<u64>,
    pub switch_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStatus {
    pub role: Role,
    pub configured: bool,
    pub health: String,
    pub last_checked_secs_ago: Option<f64>,
    pub check_interval_secs: u64,
    pub probes: u64,
}

impl From<HealthStatus> for BackendStatus {
    fn from(status: HealthStatus) -> Self {
        Self {
            role: status.role,
            configured: status.configured,
            health: status.state.as_str().to_string(),
            last_checked_secs_ago: status.last_checked_ago.map(|d| d.as_secs_f64()),
            check_interval_secs: status.check_interval_floor.as_secs(),
            probes: status.probes,
        }
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<RouterStatus> {
    let snapshot = state.router.failover_state();
    Json(RouterStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_role: snapshot.active,
        last_switched_at: snapshot.last_switched_at.map(unix_millis),
        switch_count: snapshot.switch_count,
    })
}

/// Probes both stores (rate limited) before reporting.
pub async fn get_backends(State(state): State<AdminState>) -> Json<Vec<BackendStatus>> {
    let statuses = state.router.check_backends().await;
    Json(statuses.into_iter().map(BackendStatus::from).collect())
}
