//! Fault-injecting store decorator.
//!
//! Wraps any [`Store`] and, on demand, makes it behave like a remote backend
//! in trouble: hard outage, added latency, or random connection drops.
//! Used by the failover drill in `router-cli` and by the test suites.
//!
//! # Design Decisions
//! - Injected faults are connectivity-class errors only; operation errors
//!   come from the wrapped store itself
//! - Every call is counted per operation so callers can assert exactly
//!   which backend served a request

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::store::error::{StoreError, StoreResult};
use crate::store::local::LocalStore;
use crate::store::models::*;
use crate::store::Store;

/// A [`Store`] wrapper with switchable failure modes.
#[derive(Debug)]
pub struct FaultyStore<S = LocalStore> {
    inner: S,
    name: String,
    down: AtomicBool,
    latency_ms: AtomicU64,
    /// f64 bits of the probability that a call is dropped.
    drop_ratio: AtomicU64,
    calls: DashMap<&'static str, u64>,
    total_calls: AtomicU64,
}

impl<S: Store> FaultyStore<S> {
    pub fn new(name: impl Into<String>, inner: S) -> Self {
        Self {
            inner,
            name: name.into(),
            down: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            drop_ratio: AtomicU64::new(0f64.to_bits()),
            calls: DashMap::new(),
            total_calls: AtomicU64::new(0),
        }
    }

    /// The wrapped store, bypassing fault injection.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fail every call with a connectivity error until cleared.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
        tracing::debug!(store = %self.name, down, "Fault injection: outage toggled");
    }

    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::SeqCst)
    }

    /// Delay every call by `latency` before it reaches the wrapped store.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Drop a random share of calls (0.0 = none, 1.0 = all).
    pub fn set_drop_ratio(&self, ratio: f64) {
        self.drop_ratio
            .store(ratio.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }

    /// Number of calls received for `operation`, including failed ones.
    pub fn calls(&self, operation: &str) -> u64 {
        self.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    /// Number of calls received across all operations.
    pub fn total_calls(&self) -> u64 {
        self.total_calls.load(Ordering::SeqCst)
    }

    /// Calls excluding the `count_users` reachability probe.
    pub fn data_calls(&self) -> u64 {
        self.total_calls() - self.calls("count_users")
    }

    async fn gate(&self, operation: &'static str) -> StoreResult<()> {
        *self.calls.entry(operation).or_insert(0) += 1;
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.is_down() {
            return Err(StoreError::Connectivity(format!(
                "{}: connection refused",
                self.name
            )));
        }

        let ratio = f64::from_bits(self.drop_ratio.load(Ordering::SeqCst));
        if ratio > 0.0 && fastrand::f64() < ratio {
            return Err(StoreError::Connectivity(format!(
                "{}: connection reset",
                self.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Store> Store for FaultyStore<S> {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        self.gate("get_user").await?;
        self.inner.get_user(id).await
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.gate("get_user_by_username").await?;
        self.inner.get_user_by_username(username).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.gate("list_users").await?;
        self.inner.list_users().await
    }

    async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
        self.gate("create_user").await?;
        self.inner.create_user(user).await
    }

    async fn update_user(&self, id: i64, user: &NewUser) -> StoreResult<User> {
        self.gate("update_user").await?;
        self.inner.update_user(id, user).await
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        self.gate("delete_user").await?;
        self.inner.delete_user(id).await
    }

    async fn count_users(&self) -> StoreResult<u64> {
        self.gate("count_users").await?;
        self.inner.count_users().await
    }

    async fn get_property(&self, id: i64) -> StoreResult<Option<Property>> {
        self.gate("get_property").await?;
        self.inner.get_property(id).await
    }

    async fn get_property_by_parcel(&self, parcel_id: &str) -> StoreResult<Option<Property>> {
        self.gate("get_property_by_parcel").await?;
        self.inner.get_property_by_parcel(parcel_id).await
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>> {
        self.gate("list_properties").await?;
        self.inner.list_properties(filter).await
    }

    async fn create_property(&self, property: &NewProperty) -> StoreResult<Property> {
        self.gate("create_property").await?;
        self.inner.create_property(property).await
    }

    async fn update_property(&self, id: i64, property: &NewProperty) -> StoreResult<Property> {
        self.gate("update_property").await?;
        self.inner.update_property(id, property).await
    }

    async fn delete_property(&self, id: i64) -> StoreResult<bool> {
        self.gate("delete_property").await?;
        self.inner.delete_property(id).await
    }

    async fn bulk_insert_properties(&self, batch: &[NewProperty]) -> StoreResult<ImportReport> {
        self.gate("bulk_insert_properties").await?;
        self.inner.bulk_insert_properties(batch).await
    }

    async fn count_properties(&self) -> StoreResult<u64> {
        self.gate("count_properties").await?;
        self.inner.count_properties().await
    }

    async fn get_cost_matrix(&self, id: i64) -> StoreResult<Option<CostMatrix>> {
        self.gate("get_cost_matrix").await?;
        self.inner.get_cost_matrix(id).await
    }

    async fn list_cost_matrices(&self, region: Option<&str>) -> StoreResult<Vec<CostMatrix>> {
        self.gate("list_cost_matrices").await?;
        self.inner.list_cost_matrices(region).await
    }

    async fn find_cost_matrix(
        &self,
        imp_type: &str,
        quality: &str,
        region: &str,
        year: i32,
    ) -> StoreResult<Option<CostMatrix>> {
        self.gate("find_cost_matrix").await?;
        self.inner.find_cost_matrix(imp_type, quality, region, year).await
    }

    async fn create_cost_matrix(&self, entry: &NewCostMatrix) -> StoreResult<CostMatrix> {
        self.gate("create_cost_matrix").await?;
        self.inner.create_cost_matrix(entry).await
    }

    async fn update_cost_matrix(&self, id: i64, entry: &NewCostMatrix) -> StoreResult<CostMatrix> {
        self.gate("update_cost_matrix").await?;
        self.inner.update_cost_matrix(id, entry).await
    }

    async fn delete_cost_matrix(&self, id: i64) -> StoreResult<bool> {
        self.gate("delete_cost_matrix").await?;
        self.inner.delete_cost_matrix(id).await
    }

    async fn import_cost_matrices(&self, batch: &[NewCostMatrix]) -> StoreResult<ImportReport> {
        self.gate("import_cost_matrices").await?;
        self.inner.import_cost_matrices(batch).await
    }

    async fn get_material(&self, id: i64) -> StoreResult<Option<Material>> {
        self.gate("get_material").await?;
        self.inner.get_material(id).await
    }

    async fn list_materials(&self) -> StoreResult<Vec<Material>> {
        self.gate("list_materials").await?;
        self.inner.list_materials().await
    }

    async fn create_material(&self, material: &NewMaterial) -> StoreResult<Material> {
        self.gate("create_material").await?;
        self.inner.create_material(material).await
    }

    async fn update_material(&self, id: i64, material: &NewMaterial) -> StoreResult<Material> {
        self.gate("update_material").await?;
        self.inner.update_material(id, material).await
    }

    async fn delete_material(&self, id: i64) -> StoreResult<bool> {
        self.gate("delete_material").await?;
        self.inner.delete_material(id).await
    }

    async fn get_calculation(&self, id: i64) -> StoreResult<Option<Calculation>> {
        self.gate("get_calculation").await?;
        self.inner.get_calculation(id).await
    }

    async fn list_calculations_for_property(&self, property_id: i64) -> StoreResult<Vec<Calculation>> {
        self.gate("list_calculations_for_property").await?;
        self.inner.list_calculations_for_property(property_id).await
    }

    async fn create_calculation(&self, calculation: &NewCalculation) -> StoreResult<Calculation> {
        self.gate("create_calculation").await?;
        self.inner.create_calculation(calculation).await
    }

    async fn delete_calculation(&self, id: i64) -> StoreResult<bool> {
        self.gate("delete_calculation").await?;
        self.inner.delete_calculation(id).await
    }

    async fn summarize_by_region(&self) -> StoreResult<Vec<RegionSummary>> {
        self.gate("summarize_by_region").await?;
        self.inner.summarize_by_region().await
    }

    async fn list_depreciation_schedules(
        &self,
        schedule_type: Option<&str>,
    ) -> StoreResult<Vec<DepreciationSchedule>> {
        self.gate("list_depreciation_schedules").await?;
        self.inner.list_depreciation_schedules(schedule_type).await
    }

    async fn create_depreciation_schedule(
        &self,
        entry: &NewDepreciationSchedule,
    ) -> StoreResult<DepreciationSchedule> {
        self.gate("create_depreciation_schedule").await?;
        self.inner.create_depreciation_schedule(entry).await
    }

    async fn find_depreciation(
        &self,
        schedule_type: &str,
        effective_age: i32,
    ) -> StoreResult<Option<DepreciationSchedule>> {
        self.gate("find_depreciation").await?;
        self.inner.find_depreciation(schedule_type, effective_age).await
    }

    async fn delete_depreciation_schedule(&self, id: i64) -> StoreResult<bool> {
        self.gate("delete_depreciation_schedule").await?;
        self.inner.delete_depreciation_schedule(id).await
    }

    async fn get_scenario(&self, id: i64) -> StoreResult<Option<Scenario>> {
        self.gate("get_scenario").await?;
        self.inner.get_scenario(id).await
    }

    async fn list_scenarios(&self, filter: &ScenarioFilter) -> StoreResult<Vec<Scenario>> {
        self.gate("list_scenarios").await?;
        self.inner.list_scenarios(filter).await
    }

    async fn create_scenario(&self, scenario: &NewScenario) -> StoreResult<Scenario> {
        self.gate("create_scenario").await?;
        self.inner.create_scenario(scenario).await
    }

    async fn delete_scenario(&self, id: i64) -> StoreResult<bool> {
        self.gate("delete_scenario").await?;
        self.inner.delete_scenario(id).await
    }

    async fn get_batch_upload(&self, id: i64) -> StoreResult<Option<BatchUpload>> {
        self.gate("get_batch_upload").await?;
        self.inner.get_batch_upload(id).await
    }

    async fn list_batch_uploads(&self) -> StoreResult<Vec<BatchUpload>> {
        self.gate("list_batch_uploads").await?;
        self.inner.list_batch_uploads().await
    }

    async fn create_batch_upload(&self, upload: &NewBatchUpload) -> StoreResult<BatchUpload> {
        self.gate("create_batch_upload").await?;
        self.inner.create_batch_upload(upload).await
    }

    async fn update_batch_upload(&self, id: i64, progress: &BatchProgress) -> StoreResult<BatchUpload> {
        self.gate("update_batch_upload").await?;
        self.inner.update_batch_upload(id, progress).await
    }
}
