//! Admin status surface.
//!
//! Read-only view of the router: active role, failover history counters,
//! per-store health. Bearer-token protected.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::router::StorageRouter;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub router: Arc<StorageRouter>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(router: Arc<StorageRouter>, api_key: &str) -> Self {
        Self {
            router,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
