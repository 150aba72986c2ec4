//! Records persisted through the store contract.
//!
//! Every entity comes as a pair: the stored record (with its id and
//! timestamps) and a `New*` payload used for inserts and full updates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Application user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

/// Assessed property (one parcel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: i64,
    pub parcel_id: String,
    pub address: String,
    pub owner: Option<String>,
    pub imp_type: Option<String>,
    pub quality: Option<String>,
    pub year_built: Option<i32>,
    pub sqft: Option<f64>,
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub parcel_id: String,
    pub address: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub imp_type: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub year_built: Option<i32>,
    #[serde(default)]
    pub sqft: Option<f64>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Filter for property listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyFilter {
    pub region: Option<String>,
    pub imp_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        let region_ok = match &self.region {
            Some(region) => property.region.as_deref() == Some(region.as_str()),
            None => true,
        };
        let type_ok = match &self.imp_type {
            Some(imp_type) => property.imp_type.as_deref() == Some(imp_type.as_str()),
            None => true,
        };
        region_ok && type_ok
    }
}

/// One row of the building cost matrix: base cost per square foot for an
/// improvement type and quality class in a region and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostMatrix {
    pub id: i64,
    pub imp_type: String,
    pub quality: String,
    pub region: String,
    pub year: i32,
    pub cost_per_sqft: f64,
    pub source: Option<String>,
    pub version: i32,
    pub effective_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCostMatrix {
    pub imp_type: String,
    pub quality: String,
    pub region: String,
    pub year: i32,
    pub cost_per_sqft: f64,
    #[serde(default)]
    pub source: Option<String>,
    pub effective_date: NaiveDate,
}

/// Building material with its unit cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub unit_cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMaterial {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub unit_cost: f64,
}

/// A recorded cost calculation (valuation) for a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub id: i64,
    pub property_id: i64,
    pub region: String,
    pub rcn: f64,
    pub percent_good: f64,
    pub final_value: f64,
    pub calculation_chain: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCalculation {
    pub property_id: i64,
    pub region: String,
    pub rcn: f64,
    pub percent_good: f64,
    pub final_value: f64,
    #[serde(default)]
    pub calculation_chain: serde_json::Value,
    #[serde(default)]
    pub created_by: Option<i64>,
}

/// Percent-good factor for a depreciation schedule at one effective age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationSchedule {
    pub id: i64,
    pub schedule_type: String,
    pub effective_age: i32,
    pub percent_good: f64,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDepreciationSchedule {
    pub schedule_type: String,
    pub effective_age: i32,
    pub percent_good: f64,
    #[serde(default)]
    pub source: Option<String>,
}

/// A saved what-if valuation: input parameters and, once run, results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub parameters: serde_json::Value,
    pub results: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
    #[serde(default)]
    pub results: Option<serde_json::Value>,
    #[serde(default)]
    pub created_by: Option<i64>,
}

/// Scenario listing, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioFilter {
    pub created_by: Option<i64>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ScenarioFilter {
    fn default() -> Self {
        Self {
            created_by: None,
            limit: 50,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
}

/// Status record of one uploaded import file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpload {
    pub id: i64,
    pub filename: String,
    pub file_type: String,
    pub status: BatchStatus,
    pub total_records: Option<u64>,
    pub processed_records: u64,
    pub error_records: u64,
    pub error_log: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBatchUpload {
    pub filename: String,
    pub file_type: String,
    #[serde(default)]
    pub created_by: Option<i64>,
}

/// Progress written back while (and after) an upload is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub status: BatchStatus,
    pub total_records: u64,
    pub processed_records: u64,
    pub error_records: u64,
    #[serde(default)]
    pub error_log: Option<String>,
}

/// Aggregate of calculated values per region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    pub count: u64,
    pub avg_value: f64,
    pub total_value: f64,
}

/// Outcome of a bulk write. Rows whose key already exists are updated in
/// place; rejected rows are reported, not fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
    pub errors: Vec<String>,
}
