//! Storage router service.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                  STORE ROUTER                     │
//!                      │                                                   │
//!   Store call         │  ┌──────────┐    ┌──────────┐    ┌────────────┐  │
//!   ───────────────────┼─▶│  facade  │───▶│ executor │───▶│  primary   │──┼──▶ Remote DB
//!                      │  └──────────┘    └────┬─────┘    └────────────┘  │
//!                      │                       │  on connectivity failure   │
//!                      │                       ▼                           │
//!                      │                  ┌──────────┐    ┌────────────┐  │
//!                      │                  │ failover │───▶│  fallback  │──┼──▶ Local store
//!                      │                  │  state   │    └────────────┘  │
//!                      │                  └──────────┘                     │
//!                      │  ┌───────────────────────────────────────────┐   │
//!                      │  │  health probes · timeouts · metrics · admin │   │
//!                      │  └───────────────────────────────────────────┘   │
//!                      └──────────────────────────────────────────────────┘
//! ```
//!
//! The binary hosts the router with its admin surface. No remote driver is
//! linked here, so the primary stays unconfigured and every call is served
//! by the local store. Embedders with a driver build the router through
//! `StorageRouter::from_config`.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use store_router::admin::{setup_admin_router, AdminState};
use store_router::config::load_config;
use store_router::observability::{logging, metrics};
use store_router::store::LocalStore;
use store_router::StorageRouter;

#[derive(Parser)]
#[command(name = "store-router")]
#[command(about = "Primary/fallback storage router", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "STORE_ROUTER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("store-router v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let fallback = Arc::new(match &config.fallback.snapshot_path {
        Some(path) => LocalStore::open(path)?,
        None => LocalStore::default(),
    });

    if config.primary.is_configured() {
        tracing::warn!(
            label = %config.primary.label,
            "No remote driver linked; primary left unconfigured"
        );
    } else {
        tracing::info!("Primary store not configured; serving from fallback only");
    }

    let router = Arc::new(StorageRouter::fallback_only(
        fallback.clone(),
        config.executor_settings(),
    ));

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin surface listening");

        let app = setup_admin_router(AdminState::new(router.clone(), &config.admin.api_key));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        shutdown_signal().await;
    }

    fallback.persist()?;
    tracing::info!(
        active_role = %router.active_role(),
        "Shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
