//! Shared fixtures for router integration tests.

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

use store_router::router::{BackendDescriptor, ExecutorSettings};
use store_router::store::{
    FaultyStore, LocalStore, NewCalculation, NewCostMatrix, NewMaterial, NewProperty, NewUser,
};
use store_router::StorageRouter;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// A router over two fault-injectable local stores.
pub struct Harness {
    pub router: Arc<StorageRouter>,
    pub primary: Arc<FaultyStore>,
    pub fallback: Arc<FaultyStore>,
}

pub fn harness(primary_configured: bool) -> Harness {
    let primary = Arc::new(FaultyStore::new("primary", LocalStore::default()));
    let fallback = Arc::new(FaultyStore::new("fallback", LocalStore::default()));
    let router = StorageRouter::new(
        BackendDescriptor::primary(primary.clone(), primary_configured),
        BackendDescriptor::fallback(fallback.clone()),
        ExecutorSettings {
            check_interval: CHECK_INTERVAL,
            probe_timeout: Duration::from_millis(500),
            operation_timeout: Duration::from_secs(2),
        },
    );

    Harness {
        router: Arc::new(router),
        primary,
        fallback,
    }
}

pub fn user(name: &str) -> NewUser {
    NewUser {
        username: name.to_string(),
        password_hash: "$argon2id$v=19$stub".to_string(),
        role: "assessor".to_string(),
    }
}

pub fn property(n: u32) -> NewProperty {
    NewProperty {
        parcel_id: format!("1-{:05}-000", n),
        address: format!("{} Columbia Park Trail", 100 + n),
        owner: Some("Benton Holdings".to_string()),
        imp_type: Some("R1".to_string()),
        quality: Some("average".to_string()),
        year_built: Some(1985 + (n % 30) as i32),
        sqft: Some(1_400.0 + n as f64),
        region: Some("east".to_string()),
    }
}

#[allow(dead_code)]
pub fn cost_matrix(region: &str, year: i32) -> NewCostMatrix {
    NewCostMatrix {
        imp_type: "R1".to_string(),
        quality: "average".to_string(),
        region: region.to_string(),
        year,
        cost_per_sqft: 138.75,
        source: Some("county cost matrix".to_string()),
        effective_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
    }
}

#[allow(dead_code)]
pub fn material(name: &str) -> NewMaterial {
    NewMaterial {
        name: name.to_string(),
        category: "framing".to_string(),
        unit: "board-ft".to_string(),
        unit_cost: 1.15,
    }
}

#[allow(dead_code)]
pub fn calculation(property_id: i64, final_value: f64) -> NewCalculation {
    NewCalculation {
        property_id,
        region: "east".to_string(),
        rcn: final_value / 0.8,
        percent_good: 0.8,
        final_value,
        calculation_chain: serde_json::json!({ "base_cost": 138.75, "percent_good": 0.8 }),
        created_by: None,
    }
}
