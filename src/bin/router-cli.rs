use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use store_router::router::{BackendDescriptor, ExecutorSettings};
use store_router::store::{FaultyStore, LocalStore, NewProperty};
use store_router::{Role, StorageRouter, Store};

#[derive(Parser)]
#[command(name = "router-cli")]
#[command(about = "Management CLI for the storage router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "STORE_ROUTER_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the active store and failover counters
    Status,
    /// Probe and list both stores
    Backends,
    /// Run an in-process failover drill with a scripted primary outage
    Drill {
        /// Number of calls to issue
        #[arg(long, default_value_t = 20)]
        calls: u32,
        /// Call number at which the primary goes down
        #[arg(long, default_value_t = 5)]
        outage_at: u32,
        /// Call number at which the primary comes back
        #[arg(long, default_value_t = 12)]
        recover_at: u32,
        /// Health check interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status => admin_get(&cli.url, &cli.key, "/admin/status").await?,
        Commands::Backends => admin_get(&cli.url, &cli.key, "/admin/backends").await?,
        Commands::Drill {
            calls,
            outage_at,
            recover_at,
            interval_ms,
        } => drill(calls, outage_at, recover_at, Duration::from_millis(interval_ms.max(1))).await?,
    }

    Ok(())
}

async fn admin_get(base: &str, key: &str, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", key))?,
    );

    let res = reqwest::Client::new()
        .get(format!("{}{}", base, path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn drill(
    calls: u32,
    outage_at: u32,
    recover_at: u32,
    interval: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let primary = Arc::new(FaultyStore::new("primary", LocalStore::default()));
    let fallback = Arc::new(FaultyStore::new("fallback", LocalStore::default()));
    let router = StorageRouter::new(
        BackendDescriptor::primary(primary.clone(), true),
        BackendDescriptor::fallback(fallback.clone()),
        ExecutorSettings {
            check_interval: interval,
            probe_timeout: interval / 4,
            operation_timeout: Duration::from_secs(1),
        },
    );

    let mut events = router.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  {}", serde_json::to_string(&event).unwrap_or_default());
        }
    });

    for i in 1..=calls {
        if i == outage_at {
            println!("-- primary outage");
            primary.set_down(true);
        }
        if i == recover_at {
            println!("-- primary recovered");
            primary.set_down(false);
            tokio::time::sleep(interval).await;
        }

        let before = fallback.data_calls();
        let result = router
            .create_property(&NewProperty {
                parcel_id: format!("DRILL-{:04}", i),
                address: format!("{} Drill Rd", i),
                owner: None,
                imp_type: Some("R1".into()),
                quality: Some("average".into()),
                year_built: Some(2001),
                sqft: Some(1_600.0),
                region: Some("drill".into()),
            })
            .await;
        let served_by = if fallback.data_calls() > before {
            Role::Fallback
        } else {
            Role::Primary
        };

        match result {
            Ok(property) => println!("call {:>3}: {} -> {}", i, property.parcel_id, served_by),
            Err(e) => println!("call {:>3}: error: {}", i, e),
        }
        tokio::time::sleep(interval / 4).await;
    }

    let snapshot = router.failover_state();
    println!(
        "done: active={} switches={} primary_rows={} fallback_rows={}",
        snapshot.active,
        snapshot.switch_count,
        primary.inner().count_properties().await?,
        fallback.inner().count_properties().await?,
    );

    drop(router);
    printer.await?;
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
