//! Metrics collection and exposition.
//!
//! # Metrics
//! - `store_router_failovers_total` (counter): transitions by from, to, reason
//! - `store_router_active_role` (gauge): 1=primary, 0=fallback
//! - `store_router_backend_health` (gauge): 1=healthy, 0=unhealthy, by role
//! - `store_router_operation_errors_total` (counter): failed calls by operation, kind
//!
//! # Design Decisions
//! - Successful calls are not counted; the hot path stays a plain delegation
//! - Recording is a no-op until `init_metrics` installs the exporter

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::store::Role;

/// Install the Prometheus exporter, serving `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_failover(from: Role, to: Role, reason: &'static str) {
    metrics::counter!(
        "store_router_failovers_total",
        "from" => from.as_str(),
        "to" => to.as_str(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_active_role(role: Role) {
    let value = match role {
        Role::Primary => 1.0,
        Role::Fallback => 0.0,
    };
    metrics::gauge!("store_router_active_role").set(value);
}

pub fn record_backend_health(role: Role, healthy: bool) {
    metrics::gauge!("store_router_backend_health", "role" => role.as_str())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_operation_error(operation: &'static str, kind: &'static str) {
    metrics::counter!(
        "store_router_operation_errors_total",
        "operation" => operation,
        "kind" => kind
    )
    .increment(1);
}
