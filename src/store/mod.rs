//! Store contract shared by every persistence backend.
//!
//! # Data Flow
//! ```text
//! Application code
//!     → Store trait (this module)
//!     → StorageRouter (router/) picks primary or fallback
//!     → concrete Store implementation:
//!         - primary: remote database (external crate)
//!         - fallback: local.rs (in-process, snapshot on disk)
//!         - faulty.rs wraps either one for drills and tests
//! ```
//!
//! # Design Decisions
//! - The contract is closed: adding an operation forces every
//!   implementation, including the router, to handle it
//! - Implementations are interchangeable; the router never special-cases
//!   an operation
//! - Errors are classified (see error.rs) so the router can tell an
//!   unreachable backend from a rejected request

pub mod error;
pub mod faulty;
pub mod local;
pub mod models;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::{StoreError, StoreResult};
pub use faulty::FaultyStore;
pub use local::LocalStore;
pub use models::*;

/// Which side of the router a store sits on.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary = 0,
    Fallback = 1,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Fallback => "fallback",
        }
    }

    /// The role traffic moves to when this one fails over.
    pub fn other(&self) -> Role {
        match self {
            Role::Primary => Role::Fallback,
            Role::Fallback => Role::Primary,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every persistence operation the assessment application needs.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Users ---

    async fn get_user(&self, id: i64) -> StoreResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn create_user(&self, user: &NewUser) -> StoreResult<User>;
    async fn update_user(&self, id: i64, user: &NewUser) -> StoreResult<User>;
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;
    /// Cheap count; also used as the reachability probe.
    async fn count_users(&self) -> StoreResult<u64>;

    // --- Properties ---

    async fn get_property(&self, id: i64) -> StoreResult<Option<Property>>;
    async fn get_property_by_parcel(&self, parcel_id: &str) -> StoreResult<Option<Property>>;
    async fn list_properties(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>>;
    async fn create_property(&self, property: &NewProperty) -> StoreResult<Property>;
    async fn update_property(&self, id: i64, property: &NewProperty) -> StoreResult<Property>;
    async fn delete_property(&self, id: i64) -> StoreResult<bool>;
    async fn bulk_insert_properties(&self, batch: &[NewProperty]) -> StoreResult<ImportReport>;
    async fn count_properties(&self) -> StoreResult<u64>;

    // --- Cost matrices ---

    async fn get_cost_matrix(&self, id: i64) -> StoreResult<Option<CostMatrix>>;
    async fn list_cost_matrices(&self, region: Option<&str>) -> StoreResult<Vec<CostMatrix>>;
    async fn find_cost_matrix(
        &self,
        imp_type: &str,
        quality: &str,
        region: &str,
        year: i32,
    ) -> StoreResult<Option<CostMatrix>>;
    async fn create_cost_matrix(&self, entry: &NewCostMatrix) -> StoreResult<CostMatrix>;
    async fn update_cost_matrix(&self, id: i64, entry: &NewCostMatrix) -> StoreResult<CostMatrix>;
    async fn delete_cost_matrix(&self, id: i64) -> StoreResult<bool>;
    async fn import_cost_matrices(&self, batch: &[NewCostMatrix]) -> StoreResult<ImportReport>;

    // --- Materials ---

    async fn get_material(&self, id: i64) -> StoreResult<Option<Material>>;
    async fn list_materials(&self) -> StoreResult<Vec<Material>>;
    async fn create_material(&self, material: &NewMaterial) -> StoreResult<Material>;
    async fn update_material(&self, id: i64, material: &NewMaterial) -> StoreResult<Material>;
    async fn delete_material(&self, id: i64) -> StoreResult<bool>;

    // --- Calculations ---

    async fn get_calculation(&self, id: i64) -> StoreResult<Option<Calculation>>;
    async fn list_calculations_for_property(&self, property_id: i64) -> StoreResult<Vec<Calculation>>;
    async fn create_calculation(&self, calculation: &NewCalculation) -> StoreResult<Calculation>;
    async fn delete_calculation(&self, id: i64) -> StoreResult<bool>;
    async fn summarize_by_region(&self) -> StoreResult<Vec<RegionSummary>>;

    // --- Depreciation schedules ---

    async fn list_depreciation_schedules(
        &self,
        schedule_type: Option<&str>,
    ) -> StoreResult<Vec<DepreciationSchedule>>;
    async fn create_depreciation_schedule(
        &self,
        entry: &NewDepreciationSchedule,
    ) -> StoreResult<DepreciationSchedule>;
    /// Row for the smallest `effective_age >= age`; past the end of the
    /// schedule, the row with the highest age.
    async fn find_depreciation(
        &self,
        schedule_type: &str,
        effective_age: i32,
    ) -> StoreResult<Option<DepreciationSchedule>>;
    async fn delete_depreciation_schedule(&self, id: i64) -> StoreResult<bool>;

    // --- Scenarios ---

    async fn get_scenario(&self, id: i64) -> StoreResult<Option<Scenario>>;
    async fn list_scenarios(&self, filter: &ScenarioFilter) -> StoreResult<Vec<Scenario>>;
    async fn create_scenario(&self, scenario: &NewScenario) -> StoreResult<Scenario>;
    async fn delete_scenario(&self, id: i64) -> StoreResult<bool>;

    // --- Batch uploads ---

    async fn get_batch_upload(&self, id: i64) -> StoreResult<Option<BatchUpload>>;
    async fn list_batch_uploads(&self) -> StoreResult<Vec<BatchUpload>>;
    /// Starts in `Processing`.
    async fn create_batch_upload(&self, upload: &NewBatchUpload) -> StoreResult<BatchUpload>;
    async fn update_batch_upload(&self, id: i64, progress: &BatchProgress) -> StoreResult<BatchUpload>;
}
