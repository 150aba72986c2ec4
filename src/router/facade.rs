//! Storage router facade.
//!
//! Implements the whole store contract by handing each call to the
//! executor. Callers see one [`Store`] and never learn which backend
//! served them.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::RouterConfig;
use crate::failover::{FailoverEvent, FailoverSnapshot};
use crate::health::HealthStatus;
use crate::router::descriptor::BackendDescriptor;
use crate::router::executor::{ExecutorSettings, OperationExecutor};
use crate::store::models::*;
use crate::store::{Role, Store, StoreResult};

/// Primary/fallback store router.
///
/// Build one at start-up and share it by `Arc`; every consumer gets the same
/// failover state.
#[derive(Debug)]
pub struct StorageRouter {
    executor: OperationExecutor,
}

impl StorageRouter {
    pub fn new(
        primary: BackendDescriptor,
        fallback: BackendDescriptor,
        settings: ExecutorSettings,
    ) -> Self {
        tracing::info!(
            primary_configured = primary.is_configured(),
            check_interval_secs = settings.check_interval.as_secs(),
            operation_timeout_ms = settings.operation_timeout.as_millis() as u64,
            "Storage router initialized on fallback"
        );
        Self {
            executor: OperationExecutor::new(primary, fallback, settings),
        }
    }

    /// Build from configuration. The primary counts as configured only when
    /// a primary URL is set.
    pub fn from_config(
        config: &RouterConfig,
        primary: Arc<dyn Store>,
        fallback: Arc<dyn Store>,
    ) -> Self {
        Self::new(
            BackendDescriptor::primary(primary, config.primary.is_configured()),
            BackendDescriptor::fallback(fallback),
            config.executor_settings(),
        )
    }

    /// Router for a process with no primary driver. The primary slot is
    /// unconfigured, so it is never probed or called and every operation
    /// is served by `fallback`.
    pub fn fallback_only(fallback: Arc<dyn Store>, settings: ExecutorSettings) -> Self {
        Self::new(
            BackendDescriptor::primary(fallback.clone(), false),
            BackendDescriptor::fallback(fallback),
            settings,
        )
    }

    /// Role currently receiving traffic.
    pub fn active_role(&self) -> Role {
        self.executor.state().active()
    }

    pub fn failover_state(&self) -> FailoverSnapshot {
        self.executor.state().snapshot()
    }

    /// Receive every failover transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FailoverEvent> {
        self.executor.state().subscribe()
    }

    /// Health of both stores, without probing.
    pub fn health(&self) -> [HealthStatus; 2] {
        [
            self.executor.monitor(Role::Primary).status(),
            self.executor.monitor(Role::Fallback).status(),
        ]
    }

    /// Probe both stores (subject to the usual rate limit) and report.
    ///
    /// A fresh primary probe is acted on exactly as a store call would.
    pub async fn check_backends(&self) -> [HealthStatus; 2] {
        self.executor.reconcile().await;
        self.executor.monitor(Role::Fallback).probe().await;
        self.health()
    }
}

#[async_trait]
impl Store for StorageRouter {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        self.executor.execute("get_user", move |s| s.get_user(id)).await
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.executor
            .execute("get_user_by_username", move |s| s.get_user_by_username(username))
            .await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.executor.execute("list_users", |s| s.list_users()).await
    }

    async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
        self.executor.execute("create_user", move |s| s.create_user(user)).await
    }

    async fn update_user(&self, id: i64, user: &NewUser) -> StoreResult<User> {
        self.executor
            .execute("update_user", move |s| s.update_user(id, user))
            .await
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        self.executor.execute("delete_user", move |s| s.delete_user(id)).await
    }

    async fn count_users(&self) -> StoreResult<u64> {
        self.executor.execute("count_users", |s| s.count_users()).await
    }

    async fn get_property(&self, id: i64) -> StoreResult<Option<Property>> {
        self.executor.execute("get_property", move |s| s.get_property(id)).await
    }

    async fn get_property_by_parcel(&self, parcel_id: &str) -> StoreResult<Option<Property>> {
        self.executor
            .execute("get_property_by_parcel", move |s| s.get_property_by_parcel(parcel_id))
            .await
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>> {
        self.executor
            .execute("list_properties", move |s| s.list_properties(filter))
            .await
    }

    async fn create_property(&self, property: &NewProperty) -> StoreResult<Property> {
        self.executor
            .execute("create_property", move |s| s.create_property(property))
            .await
    }

    async fn update_property(&self, id: i64, property: &NewProperty) -> StoreResult<Property> {
        self.executor
            .execute("update_property", move |s| s.update_property(id, property))
            .await
    }

    async fn delete_property(&self, id: i64) -> StoreResult<bool> {
        self.executor
            .execute("delete_property", move |s| s.delete_property(id))
            .await
    }

    async fn bulk_insert_properties(&self, batch: &[NewProperty]) -> StoreResult<ImportReport> {
        self.executor
            .execute("bulk_insert_properties", move |s| s.bulk_insert_properties(batch))
            .await
    }

    async fn count_properties(&self) -> StoreResult<u64> {
        self.executor.execute("count_properties", |s| s.count_properties()).await
    }

    async fn get_cost_matrix(&self, id: i64) -> StoreResult<Option<CostMatrix>> {
        self.executor
            .execute("get_cost_matrix", move |s| s.get_cost_matrix(id))
            .await
    }

    async fn list_cost_matrices(&self, region: Option<&str>) -> StoreResult<Vec<CostMatrix>> {
        self.executor
            .execute("list_cost_matrices", move |s| s.list_cost_matrices(region))
            .await
    }

    async fn find_cost_matrix(
        &self,
        imp_type: &str,
        quality: &str,
        region: &str,
        year: i32,
    ) -> StoreResult<Option<CostMatrix>> {
        self.executor
            .execute("find_cost_matrix", move |s| {
                s.find_cost_matrix(imp_type, quality, region, year)
            })
            .await
    }

    async fn create_cost_matrix(&self, entry: &NewCostMatrix) -> StoreResult<CostMatrix> {
        self.executor
            .execute("create_cost_matrix", move |s| s.create_cost_matrix(entry))
            .await
    }

    async fn update_cost_matrix(&self, id: i64, entry: &NewCostMatrix) -> StoreResult<CostMatrix> {
        self.executor
            .execute("update_cost_matrix", move |s| s.update_cost_matrix(id, entry))
            .await
    }

    async fn delete_cost_matrix(&self, id: i64) -> StoreResult<bool> {
        self.executor
            .execute("delete_cost_matrix", move |s| s.delete_cost_matrix(id))
            .await
    }

    async fn import_cost_matrices(&self, batch: &[NewCostMatrix]) -> StoreResult<ImportReport> {
        self.executor
            .execute("import_cost_matrices", move |s| s.import_cost_matrices(batch))
            .await
    }

    async fn get_material(&self, id: i64) -> StoreResult<Option<Material>> {
        self.executor.execute("get_material", move |s| s.get_material(id)).await
    }

    async fn list_materials(&self) -> StoreResult<Vec<Material>> {
        self.executor.execute("list_materials", |s| s.list_materials()).await
    }

    async fn create_material(&self, material: &NewMaterial) -> StoreResult<Material> {
        self.executor
            .execute("create_material", move |s| s.create_material(material))
            .await
    }

    async fn update_material(&self, id: i64, material: &NewMaterial) -> StoreResult<Material> {
        self.executor
            .execute("update_material", move |s| s.update_material(id, material))
            .await
    }

    async fn delete_material(&self, id: i64) -> StoreResult<bool> {
        self.executor
            .execute("delete_material", move |s| s.delete_material(id))
            .await
    }

    async fn get_calculation(&self, id: i64) -> StoreResult<Option<Calculation>> {
        self.executor
            .execute("get_calculation", move |s| s.get_calculation(id))
            .await
    }

    async fn list_calculations_for_property(&self, property_id: i64) -> StoreResult<Vec<Calculation>> {
        self.executor
            .execute("list_calculations_for_property", move |s| {
                s.list_calculations_for_property(property_id)
            })
            .await
    }

    async fn create_calculation(&self, calculation: &NewCalculation) -> StoreResult<Calculation> {
        self.executor
            .execute("create_calculation", move |s| s.create_calculation(calculation))
            .await
    }

    async fn delete_calculation(&self, id: i64) -> StoreResult<bool> {
        self.executor
            .execute("delete_calculation", move |s| s.delete_calculation(id))
            .await
    }

    async fn summarize_by_region(&self) -> StoreResult<Vec<RegionSummary>> {
        self.executor
            .execute("summarize_by_region", |s| s.summarize_by_region())
            .await
    }

    async fn list_depreciation_schedules(
        &self,
        schedule_type: Option<&str>,
    ) -> StoreResult<Vec<DepreciationSchedule>> {
        self.executor
            .execute("list_depreciation_schedules", move |s| {
                s.list_depreciation_schedules(schedule_type)
            })
            .await
    }

    async fn create_depreciation_schedule(
        &self,
        entry: &NewDepreciationSchedule,
    ) -> StoreResult<DepreciationSchedule> {
        self.executor
            .execute("create_depreciation_schedule", move |s| {
                s.create_depreciation_schedule(entry)
            })
            .await
    }

    async fn find_depreciation(
        &self,
        schedule_type: &str,
        effective_age: i32,
    ) -> StoreResult<Option<DepreciationSchedule>> {
        self.executor
            .execute("find_depreciation", move |s| {
                s.find_depreciation(schedule_type, effective_age)
            })
            .await
    }

    async fn delete_depreciation_schedule(&self, id: i64) -> StoreResult<bool> {
        self.executor
            .execute("delete_depreciation_schedule", move |s| {
                s.delete_depreciation_schedule(id)
            })
            .await
    }

    async fn get_scenario(&self, id: i64) -> StoreResult<Option<Scenario>> {
        self.executor
            .execute("get_scenario", move |s| s.get_scenario(id))
            .await
    }

    async fn list_scenarios(&self, filter: &ScenarioFilter) -> StoreResult<Vec<Scenario>> {
        self.executor
            .execute("list_scenarios", move |s| s.list_scenarios(filter))
            .await
    }

    async fn create_scenario(&self, scenario: &NewScenario) -> StoreResult<Scenario> {
        self.executor
            .execute("create_scenario", move |s| s.create_scenario(scenario))
            .await
    }

    async fn delete_scenario(&self, id: i64) -> StoreResult<bool> {
        self.executor
            .execute("delete_scenario", move |s| s.delete_scenario(id))
            .await
    }

    async fn get_batch_upload(&self, id: i64) -> StoreResult<Option<BatchUpload>> {
        self.executor
            .execute("get_batch_upload", move |s| s.get_batch_upload(id))
            .await
    }

    async fn list_batch_uploads(&self) -> StoreResult<Vec<BatchUpload>> {
        self.executor
            .execute("list_batch_uploads", |s| s.list_batch_uploads())
            .await
    }

    async fn create_batch_upload(&self, upload: &NewBatchUpload) -> StoreResult<BatchUpload> {
        self.executor
            .execute("create_batch_upload", move |s| s.create_batch_upload(upload))
            .await
    }

    async fn update_batch_upload(&self, id: i64, progress: &BatchProgress) -> StoreResult<BatchUpload> {
        self.executor
            .execute("update_batch_upload", move |s| {
                s.update_batch_upload(id, progress)
            })
            .await
    }
}
