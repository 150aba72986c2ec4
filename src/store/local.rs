//! Local in-process store.
//!
//! # Responsibilities
//! - Serve the full store contract from memory
//! - Enforce the same uniqueness and validation rules a database would
//! - Persist to and restore from a JSON snapshot on disk
//!
//! This is the store the router falls back to; it is always available.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::store::error::{StoreError, StoreResult};
use crate::store::models::*;
use crate::store::Store;

/// On-disk form of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct Snapshot {
    users: Vec<User>,
    properties: Vec<Property>,
    cost_matrices: Vec<CostMatrix>,
    materials: Vec<Material>,
    calculations: Vec<Calculation>,
    depreciation: Vec<DepreciationSchedule>,
    scenarios: Vec<Scenario>,
    batch_uploads: Vec<BatchUpload>,
}

/// A thread-safe in-memory implementation of [`Store`].
#[derive(Debug)]
pub struct LocalStore {
    users: DashMap<i64, User>,
    properties: DashMap<i64, Property>,
    cost_matrices: DashMap<i64, CostMatrix>,
    materials: DashMap<i64, Material>,
    calculations: DashMap<i64, Calculation>,
    depreciation: DashMap<i64, DepreciationSchedule>,
    scenarios: DashMap<i64, Scenario>,
    batch_uploads: DashMap<i64, BatchUpload>,
    next_id: AtomicI64,
    /// Held across check-then-insert so unique keys stay unique.
    writes: Mutex<()>,
    snapshot_path: Option<PathBuf>,
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LocalStore {
    /// Create an empty store. `snapshot_path` is where [`persist`](Self::persist) writes.
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            users: DashMap::new(),
            properties: DashMap::new(),
            cost_matrices: DashMap::new(),
            materials: DashMap::new(),
            calculations: DashMap::new(),
            depreciation: DashMap::new(),
            scenarios: DashMap::new(),
            batch_uploads: DashMap::new(),
            next_id: AtomicI64::new(1),
            writes: Mutex::new(()),
            snapshot_path,
        }
    }

    /// Open a store backed by `path`, loading the snapshot if one exists.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let store = Self::new(Some(path.to_path_buf()));
        if !path.exists() {
            return Ok(store);
        }

        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;

        let mut max_id = 0;
        for user in snapshot.users {
            max_id = max_id.max(user.id);
            store.users.insert(user.id, user);
        }
        for property in snapshot.properties {
            max_id = max_id.max(property.id);
            store.properties.insert(property.id, property);
        }
        for entry in snapshot.cost_matrices {
            max_id = max_id.max(entry.id);
            store.cost_matrices.insert(entry.id, entry);
        }
        for material in snapshot.materials {
            max_id = max_id.max(material.id);
            store.materials.insert(material.id, material);
        }
        for calculation in snapshot.calculations {
            max_id = max_id.max(calculation.id);
            store.calculations.insert(calculation.id, calculation);
        }
        for entry in snapshot.depreciation {
            max_id = max_id.max(entry.id);
            store.depreciation.insert(entry.id, entry);
        }
        for scenario in snapshot.scenarios {
            max_id = max_id.max(scenario.id);
            store.scenarios.insert(scenario.id, scenario);
        }
        for upload in snapshot.batch_uploads {
            max_id = max_id.max(upload.id);
            store.batch_uploads.insert(upload.id, upload);
        }
        store.next_id.store(max_id + 1, Ordering::Relaxed);

        tracing::info!(
            path = %path.display(),
            users = store.users.len(),
            properties = store.properties.len(),
            cost_matrices = store.cost_matrices.len(),
            "Loaded local store snapshot"
        );
        Ok(store)
    }

    /// Write the current contents to the snapshot path, if one is set.
    pub fn persist(&self) -> std::io::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let snapshot = Snapshot {
            users: sorted(&self.users),
            properties: sorted(&self.properties),
            cost_matrices: sorted(&self.cost_matrices),
            materials: sorted(&self.materials),
            calculations: sorted(&self.calculations),
            depreciation: sorted(&self.depreciation),
            scenarios: sorted(&self.scenarios),
            batch_uploads: sorted(&self.batch_uploads),
        };

        // Write-then-rename so a crash never leaves a truncated snapshot.
        let tmp = path.with_extension("tmp");
        {
            let writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(writer, &snapshot)?;
        }
        fs::rename(&tmp, path)?;

        tracing::debug!(path = %path.display(), "Local store snapshot written");
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no broken state.
        self.writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert_property(&self, input: &NewProperty) -> StoreResult<Property> {
        validate_property(input)?;
        if self
            .properties
            .iter()
            .any(|p| p.parcel_id == input.parcel_id)
        {
            return Err(StoreError::Conflict(format!(
                "parcel {} already exists",
                input.parcel_id
            )));
        }

        let now = Utc::now();
        let property = Property {
            id: self.next_id(),
            parcel_id: input.parcel_id.clone(),
            address: input.address.clone(),
            owner: input.owner.clone(),
            imp_type: input.imp_type.clone(),
            quality: input.quality.clone(),
            year_built: input.year_built,
            sqft: input.sqft,
            region: input.region.clone(),
            created_at: now,
            updated_at: now,
        };
        self.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn insert_cost_matrix(&self, input: &NewCostMatrix) -> StoreResult<CostMatrix> {
        validate_cost_matrix(input)?;
        if self.cost_matrices.iter().any(|c| same_cost_key(&c, input)) {
            return Err(StoreError::Conflict(format!(
                "cost matrix {}/{}/{}/{} already exists",
                input.imp_type, input.quality, input.region, input.year
            )));
        }

        let entry = CostMatrix {
            id: self.next_id(),
            imp_type: input.imp_type.clone(),
            quality: input.quality.clone(),
            region: input.region.clone(),
            year: input.year,
            cost_per_sqft: input.cost_per_sqft,
            source: input.source.clone(),
            version: 1,
            effective_date: input.effective_date,
            created_at: Utc::now(),
        };
        self.cost_matrices.insert(entry.id, entry.clone());
        Ok(entry)
    }

    /// Bulk-import path: a known parcel is overwritten, not rejected.
    fn upsert_property(&self, input: &NewProperty) -> StoreResult<Upsert> {
        validate_property(input)?;
        let existing = self
            .properties
            .iter()
            .find(|p| p.parcel_id == input.parcel_id)
            .map(|p| *p.key());

        let Some(id) = existing else {
            self.insert_property(input)?;
            return Ok(Upsert::Inserted);
        };
        if let Some(mut property) = self.properties.get_mut(&id) {
            property.address = input.address.clone();
            property.owner = input.owner.clone();
            property.imp_type = input.imp_type.clone();
            property.quality = input.quality.clone();
            property.year_built = input.year_built;
            property.sqft = input.sqft;
            property.region = input.region.clone();
            property.updated_at = Utc::now();
        }
        Ok(Upsert::Updated)
    }

    /// Bulk-import path: a known cost key gets the new cost, source and
    /// effective date. The version is left as is.
    fn upsert_cost_matrix(&self, input: &NewCostMatrix) -> StoreResult<Upsert> {
        validate_cost_matrix(input)?;
        let existing = self
            .cost_matrices
            .iter()
            .find(|c| same_cost_key(c, input))
            .map(|c| *c.key());

        let Some(id) = existing else {
            self.insert_cost_matrix(input)?;
            return Ok(Upsert::Inserted);
        };
        if let Some(mut entry) = self.cost_matrices.get_mut(&id) {
            entry.cost_per_sqft = input.cost_per_sqft;
            entry.source = input.source.clone();
            entry.effective_date = input.effective_date;
        }
        Ok(Upsert::Updated)
    }
}

enum Upsert {
    Inserted,
    Updated,
}

impl ImportReport {
    fn record(&mut self, outcome: StoreResult<Upsert>, key: &str) {
        match outcome {
            Ok(Upsert::Inserted) => self.inserted += 1,
            Ok(Upsert::Updated) => self.updated += 1,
            Err(e) => {
                self.rejected += 1;
                self.errors.push(format!("{}: {}", key, e));
            }
        }
    }
}

fn sorted<T: Clone>(map: &DashMap<i64, T>) -> Vec<T> {
    let mut entries: Vec<(i64, T)> = map.iter().map(|e| (*e.key(), e.value().clone())).collect();
    entries.sort_by_key(|(id, _)| *id);
    entries.into_iter().map(|(_, v)| v).collect()
}

fn same_cost_key(entry: &CostMatrix, input: &NewCostMatrix) -> bool {
    entry.imp_type == input.imp_type
        && entry.quality == input.quality
        && entry.region == input.region
        && entry.year == input.year
}

fn validate_user(input: &NewUser) -> StoreResult<()> {
    if input.username.trim().is_empty() {
        return Err(StoreError::Invalid("username must not be empty".into()));
    }
    Ok(())
}

fn validate_property(input: &NewProperty) -> StoreResult<()> {
    if input.parcel_id.trim().is_empty() {
        return Err(StoreError::Invalid("parcel_id must not be empty".into()));
    }
    if matches!(input.sqft, Some(sqft) if sqft <= 0.0) {
        return Err(StoreError::Invalid("sqft must be positive".into()));
    }
    Ok(())
}

fn validate_cost_matrix(input: &NewCostMatrix) -> StoreResult<()> {
    if input.cost_per_sqft <= 0.0 {
        return Err(StoreError::Invalid("cost_per_sqft must be positive".into()));
    }
    Ok(())
}

fn validate_depreciation(input: &NewDepreciationSchedule) -> StoreResult<()> {
    if input.schedule_type.trim().is_empty() {
        return Err(StoreError::Invalid("schedule_type must not be empty".into()));
    }
    if input.effective_age < 0 {
        return Err(StoreError::Invalid("effective_age must not be negative".into()));
    }
    if !(0.0..=1.0).contains(&input.percent_good) {
        return Err(StoreError::Invalid(format!(
            "percent_good {} outside 0..=1",
            input.percent_good
        )));
    }
    Ok(())
}

fn validate_material(input: &NewMaterial) -> StoreResult<()> {
    if input.name.trim().is_empty() {
        return Err(StoreError::Invalid("material name must not be empty".into()));
    }
    if input.unit_cost < 0.0 {
        return Err(StoreError::Invalid("unit_cost must not be negative".into()));
    }
    Ok(())
}

#[async_trait]
impl Store for LocalStore {
    async fn get_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(sorted(&self.users))
    }

    async fn create_user(&self, input: &NewUser) -> StoreResult<User> {
        validate_user(input)?;
        let _guard = self.lock_writes();
        if self.users.iter().any(|u| u.username == input.username) {
            return Err(StoreError::Conflict(format!(
                "username {} already taken",
                input.username
            )));
        }

        let now = Utc::now();
        let user = User {
            id: self.next_id(),
            username: input.username.clone(),
            password_hash: input.password_hash.clone(),
            role: input.role.clone(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i64, input: &NewUser) -> StoreResult<User> {
        validate_user(input)?;
        let _guard = self.lock_writes();
        if self
            .users
            .iter()
            .any(|u| u.id != id && u.username == input.username)
        {
            return Err(StoreError::Conflict(format!(
                "username {} already taken",
                input.username
            )));
        }

        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        user.username = input.username.clone();
        user.password_hash = input.password_hash.clone();
        user.role = input.role.clone();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        Ok(self.users.remove(&id).is_some())
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(self.users.len() as u64)
    }

    async fn get_property(&self, id: i64) -> StoreResult<Option<Property>> {
        Ok(self.properties.get(&id).map(|p| p.clone()))
    }

    async fn get_property_by_parcel(&self, parcel_id: &str) -> StoreResult<Option<Property>> {
        Ok(self
            .properties
            .iter()
            .find(|p| p.parcel_id == parcel_id)
            .map(|p| p.clone()))
    }

    async fn list_properties(&self, filter: &PropertyFilter) -> StoreResult<Vec<Property>> {
        let matching = sorted(&self.properties)
            .into_iter()
            .filter(|p| filter.matches(p))
            .skip(filter.offset);
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn create_property(&self, input: &NewProperty) -> StoreResult<Property> {
        let _guard = self.lock_writes();
        self.insert_property(input)
    }

    async fn update_property(&self, id: i64, input: &NewProperty) -> StoreResult<Property> {
        validate_property(input)?;
        let _guard = self.lock_writes();
        if self
            .properties
            .iter()
            .any(|p| p.id != id && p.parcel_id == input.parcel_id)
        {
            return Err(StoreError::Conflict(format!(
                "parcel {} already exists",
                input.parcel_id
            )));
        }

        let mut property = self
            .properties
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("property", id))?;
        property.parcel_id = input.parcel_id.clone();
        property.address = input.address.clone();
        property.owner = input.owner.clone();
        property.imp_type = input.imp_type.clone();
        property.quality = input.quality.clone();
        property.year_built = input.year_built;
        property.sqft = input.sqft;
        property.region = input.region.clone();
        property.updated_at = Utc::now();
        Ok(property.clone())
    }

    async fn delete_property(&self, id: i64) -> StoreResult<bool> {
        let _guard = self.lock_writes();
        let removed = self.properties.remove(&id).is_some();
        if removed {
            self.calculations.retain(|_, c| c.property_id != id);
        }
        Ok(removed)
    }

    async fn bulk_insert_properties(&self, batch: &[NewProperty]) -> StoreResult<ImportReport> {
        let _guard = self.lock_writes();
        let mut report = ImportReport::default();
        for input in batch {
            report.record(self.upsert_property(input), &input.parcel_id);
        }
        Ok(report)
    }

    async fn count_properties(&self) -> StoreResult<u64> {
        Ok(self.properties.len() as u64)
    }

    async fn get_cost_matrix(&self, id: i64) -> StoreResult<Option<CostMatrix>> {
        Ok(self.cost_matrices.get(&id).map(|c| c.clone()))
    }

    async fn list_cost_matrices(&self, region: Option<&str>) -> StoreResult<Vec<CostMatrix>> {
        Ok(sorted(&self.cost_matrices)
            .into_iter()
            .filter(|c| region.map_or(true, |r| c.region == r))
            .collect())
    }

    async fn find_cost_matrix(
        &self,
        imp_type: &str,
        quality: &str,
        region: &str,
        year: i32,
    ) -> StoreResult<Option<CostMatrix>> {
        Ok(self
            .cost_matrices
            .iter()
            .find(|c| {
                c.imp_type == imp_type && c.quality == quality && c.region == region && c.year == year
            })
            .map(|c| c.clone()))
    }

    async fn create_cost_matrix(&self, input: &NewCostMatrix) -> StoreResult<CostMatrix> {
        let _guard = self.lock_writes();
        self.insert_cost_matrix(input)
    }

    async fn update_cost_matrix(&self, id: i64, input: &NewCostMatrix) -> StoreResult<CostMatrix> {
        validate_cost_matrix(input)?;
        let _guard = self.lock_writes();
        if self
            .cost_matrices
            .iter()
            .any(|c| c.id != id && same_cost_key(&c, input))
        {
            return Err(StoreError::Conflict(format!(
                "cost matrix {}/{}/{}/{} already exists",
                input.imp_type, input.quality, input.region, input.year
            )));
        }

        let mut entry = self
            .cost_matrices
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("cost matrix", id))?;
        entry.imp_type = input.imp_type.clone();
        entry.quality = input.quality.clone();
        entry.region = input.region.clone();
        entry.year = input.year;
        entry.cost_per_sqft = input.cost_per_sqft;
        entry.source = input.source.clone();
        entry.effective_date = input.effective_date;
        entry.version += 1;
        Ok(entry.clone())
    }

    async fn delete_cost_matrix(&self, id: i64) -> StoreResult<bool> {
        Ok(self.cost_matrices.remove(&id).is_some())
    }

    async fn import_cost_matrices(&self, batch: &[NewCostMatrix]) -> StoreResult<ImportReport> {
        let _guard = self.lock_writes();
        let mut report = ImportReport::default();
        for input in batch {
            let key = format!(
                "{}/{}/{}/{}",
                input.imp_type, input.quality, input.region, input.year
            );
            report.record(self.upsert_cost_matrix(input), &key);
        }
        Ok(report)
    }

    async fn get_material(&self, id: i64) -> StoreResult<Option<Material>> {
        Ok(self.materials.get(&id).map(|m| m.clone()))
    }

    async fn list_materials(&self) -> StoreResult<Vec<Material>> {
        Ok(sorted(&self.materials))
    }

    async fn create_material(&self, input: &NewMaterial) -> StoreResult<Material> {
        validate_material(input)?;
        let _guard = self.lock_writes();
        if self.materials.iter().any(|m| m.name == input.name) {
            return Err(StoreError::Conflict(format!(
                "material {} already exists",
                input.name
            )));
        }

        let now = Utc::now();
        let material = Material {
            id: self.next_id(),
            name: input.name.clone(),
            category: input.category.clone(),
            unit: input.unit.clone(),
            unit_cost: input.unit_cost,
            created_at: now,
            updated_at: now,
        };
        self.materials.insert(material.id, material.clone());
        Ok(material)
    }

    async fn update_material(&self, id: i64, input: &NewMaterial) -> StoreResult<Material> {
        validate_material(input)?;
        let _guard = self.lock_writes();
        if self
            .materials
            .iter()
            .any(|m| m.id != id && m.name == input.name)
        {
            return Err(StoreError::Conflict(format!(
                "material {} already exists",
                input.name
            )));
        }

        let mut material = self
            .materials
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("material", id))?;
        material.name = input.name.clone();
        material.category = input.category.clone();
        material.unit = input.unit.clone();
        material.unit_cost = input.unit_cost;
        material.updated_at = Utc::now();
        Ok(material.clone())
    }

    async fn delete_material(&self, id: i64) -> StoreResult<bool> {
        Ok(self.materials.remove(&id).is_some())
    }

    async fn get_calculation(&self, id: i64) -> StoreResult<Option<Calculation>> {
        Ok(self.calculations.get(&id).map(|c| c.clone()))
    }

    async fn list_calculations_for_property(&self, property_id: i64) -> StoreResult<Vec<Calculation>> {
        Ok(sorted(&self.calculations)
            .into_iter()
            .filter(|c| c.property_id == property_id)
            .collect())
    }

    async fn create_calculation(&self, input: &NewCalculation) -> StoreResult<Calculation> {
        if !(0.0..=1.0).contains(&input.percent_good) {
            return Err(StoreError::Invalid(format!(
                "percent_good {} outside 0..=1",
                input.percent_good
            )));
        }
        let _guard = self.lock_writes();
        if !self.properties.contains_key(&input.property_id) {
            return Err(StoreError::not_found("property", input.property_id));
        }

        let calculation = Calculation {
            id: self.next_id(),
            property_id: input.property_id,
            region: input.region.clone(),
            rcn: input.rcn,
            percent_good: input.percent_good,
            final_value: input.final_value,
            calculation_chain: input.calculation_chain.clone(),
            created_at: Utc::now(),
            created_by: input.created_by,
        };
        self.calculations.insert(calculation.id, calculation.clone());
        Ok(calculation)
    }

    async fn delete_calculation(&self, id: i64) -> StoreResult<bool> {
        Ok(self.calculations.remove(&id).is_some())
    }

    async fn summarize_by_region(&self) -> StoreResult<Vec<RegionSummary>> {
        let mut totals: HashMap<String, (u64, f64)> = HashMap::new();
        for calculation in self.calculations.iter() {
            let entry = totals.entry(calculation.region.clone()).or_default();
            entry.0 += 1;
            entry.1 += calculation.final_value;
        }

        let mut summaries: Vec<RegionSummary> = totals
            .into_iter()
            .map(|(region, (count, total_value))| RegionSummary {
                region,
                count,
                avg_value: total_value / count as f64,
                total_value,
            })
            .collect();
        summaries.sort_by(|a, b| a.region.cmp(&b.region));
        Ok(summaries)
    }

    async fn list_depreciation_schedules(
        &self,
        schedule_type: Option<&str>,
    ) -> StoreResult<Vec<DepreciationSchedule>> {
        let mut rows: Vec<DepreciationSchedule> = self
            .depreciation
            .iter()
            .filter(|d| schedule_type.map_or(true, |t| d.schedule_type == t))
            .map(|d| d.clone())
            .collect();
        rows.sort_by(|a, b| {
            a.schedule_type
                .cmp(&b.schedule_type)
                .then(a.effective_age.cmp(&b.effective_age))
        });
        Ok(rows)
    }

    async fn create_depreciation_schedule(
        &self,
        input: &NewDepreciationSchedule,
    ) -> StoreResult<DepreciationSchedule> {
        validate_depreciation(input)?;
        let _guard = self.lock_writes();
        if self.depreciation.iter().any(|d| {
            d.schedule_type == input.schedule_type && d.effective_age == input.effective_age
        }) {
            return Err(StoreError::Conflict(format!(
                "depreciation {} at age {} already exists",
                input.schedule_type, input.effective_age
            )));
        }

        let entry = DepreciationSchedule {
            id: self.next_id(),
            schedule_type: input.schedule_type.clone(),
            effective_age: input.effective_age,
            percent_good: input.percent_good,
            source: input.source.clone(),
            created_at: Utc::now(),
        };
        self.depreciation.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn find_depreciation(
        &self,
        schedule_type: &str,
        effective_age: i32,
    ) -> StoreResult<Option<DepreciationSchedule>> {
        let rows = self.list_depreciation_schedules(Some(schedule_type)).await?;
        let at_or_above = rows.iter().find(|d| d.effective_age >= effective_age);
        Ok(at_or_above.or_else(|| rows.last()).cloned())
    }

    async fn delete_depreciation_schedule(&self, id: i64) -> StoreResult<bool> {
        Ok(self.depreciation.remove(&id).is_some())
    }

    async fn get_scenario(&self, id: i64) -> StoreResult<Option<Scenario>> {
        Ok(self.scenarios.get(&id).map(|s| s.clone()))
    }

    async fn list_scenarios(&self, filter: &ScenarioFilter) -> StoreResult<Vec<Scenario>> {
        let mut rows = sorted(&self.scenarios);
        rows.reverse();
        Ok(rows
            .into_iter()
            .filter(|s| filter.created_by.map_or(true, |by| s.created_by == Some(by)))
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn create_scenario(&self, input: &NewScenario) -> StoreResult<Scenario> {
        if input.name.trim().is_empty() {
            return Err(StoreError::Invalid("scenario name must not be empty".into()));
        }

        let scenario = Scenario {
            id: self.next_id(),
            name: input.name.clone(),
            description: input.description.clone(),
            parameters: input.parameters.clone(),
            results: input.results.clone(),
            created_at: Utc::now(),
            created_by: input.created_by,
        };
        self.scenarios.insert(scenario.id, scenario.clone());
        Ok(scenario)
    }

    async fn delete_scenario(&self, id: i64) -> StoreResult<bool> {
        Ok(self.scenarios.remove(&id).is_some())
    }

    async fn get_batch_upload(&self, id: i64) -> StoreResult<Option<BatchUpload>> {
        Ok(self.batch_uploads.get(&id).map(|b| b.clone()))
    }

    async fn list_batch_uploads(&self) -> StoreResult<Vec<BatchUpload>> {
        Ok(sorted(&self.batch_uploads))
    }

    async fn create_batch_upload(&self, input: &NewBatchUpload) -> StoreResult<BatchUpload> {
        if input.filename.trim().is_empty() {
            return Err(StoreError::Invalid("filename must not be empty".into()));
        }

        let upload = BatchUpload {
            id: self.next_id(),
            filename: input.filename.clone(),
            file_type: input.file_type.clone(),
            status: BatchStatus::Processing,
            total_records: None,
            processed_records: 0,
            error_records: 0,
            error_log: None,
            created_at: Utc::now(),
            completed_at: None,
            created_by: input.created_by,
        };
        self.batch_uploads.insert(upload.id, upload.clone());
        Ok(upload)
    }

    async fn update_batch_upload(&self, id: i64, progress: &BatchProgress) -> StoreResult<BatchUpload> {
        let mut upload = self
            .batch_uploads
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("batch upload", id))?;
        if upload.status != BatchStatus::Processing {
            return Err(StoreError::Conflict(format!(
                "batch upload {} already finished",
                id
            )));
        }

        upload.status = progress.status;
        upload.total_records = Some(progress.total_records);
        upload.processed_records = progress.processed_records;
        upload.error_records = progress.error_records;
        upload.error_log = progress.error_log.clone();
        if progress.status != BatchStatus::Processing {
            upload.completed_at = Some(Utc::now());
        }
        Ok(upload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            role: "assessor".to_string(),
        }
    }

    fn new_property(parcel: &str, region: &str) -> NewProperty {
        NewProperty {
            parcel_id: parcel.to_string(),
            address: format!("{} Main St", parcel),
            owner: None,
            imp_type: Some("R1".to_string()),
            quality: Some("average".to_string()),
            year_built: Some(1998),
            sqft: Some(1850.0),
            region: Some(region.to_string()),
        }
    }

    fn new_cost(region: &str, year: i32) -> NewCostMatrix {
        NewCostMatrix {
            imp_type: "R1".to_string(),
            quality: "average".to_string(),
            region: region.to_string(),
            year,
            cost_per_sqft: 142.5,
            source: Some("2024 matrix".to_string()),
            effective_date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_user_crud() {
        let store = LocalStore::default();
        let user = store.create_user(&new_user("alice")).await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 1);

        let found = store.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        let mut renamed = new_user("alice2");
        renamed.role = "admin".to_string();
        let updated = store.update_user(user.id, &renamed).await.unwrap();
        assert_eq!(updated.role, "admin");

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(!store.delete_user(user.id).await.unwrap());
        assert!(store.get_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_username_is_operation_error() {
        let store = LocalStore::default();
        store.create_user(&new_user("bob")).await.unwrap();
        let err = store.create_user(&new_user("bob")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(!err.is_connectivity());
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = LocalStore::default();
        let err = store.update_material(99, &NewMaterial {
            name: "rebar".into(),
            category: "steel".into(),
            unit: "ton".into(),
            unit_cost: 900.0,
        }).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "material", .. }));
    }

    #[tokio::test]
    async fn test_property_filter_and_bulk_insert() {
        let store = LocalStore::default();
        let batch = vec![
            new_property("P-1", "north"),
            new_property("P-2", "south"),
            new_property("P-3", "north"),
            new_property("", "north"),
        ];
        let report = store.bulk_insert_properties(&batch).await.unwrap();
        assert_eq!(report.inserted, 3);
        assert_eq!(report.rejected, 1);
        assert!(report.errors[0].contains("parcel_id must not be empty"));

        let north = store
            .list_properties(&PropertyFilter {
                region: Some("north".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(north.len(), 2);

        let paged = store
            .list_properties(&PropertyFilter {
                limit: Some(1),
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].parcel_id, "P-2");
    }

    #[tokio::test]
    async fn test_cost_matrix_versioning() {
        let store = LocalStore::default();
        let entry = store.create_cost_matrix(&new_cost("east", 2024)).await.unwrap();
        assert_eq!(entry.version, 1);

        let mut revised = new_cost("east", 2024);
        revised.cost_per_sqft = 150.0;
        let updated = store.update_cost_matrix(entry.id, &revised).await.unwrap();
        assert_eq!(updated.version, 2);

        let found = store
            .find_cost_matrix("R1", "average", "east", 2024)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.cost_per_sqft, 150.0);

        let report = store
            .import_cost_matrices(&[new_cost("east", 2024), new_cost("west", 2024)])
            .await
            .unwrap();
        assert_eq!((report.inserted, report.updated, report.rejected), (1, 1, 0));
        assert_eq!(store.list_cost_matrices(Some("west")).await.unwrap().len(), 1);

        // Import overwrites the cost in place and keeps the version.
        let reimported = store.get_cost_matrix(entry.id).await.unwrap().unwrap();
        assert_eq!(reimported.cost_per_sqft, 142.5);
        assert_eq!(reimported.version, 2);
    }

    #[tokio::test]
    async fn test_reimport_updates_existing_parcel() {
        let store = LocalStore::default();
        let mut first = new_property("1-00001-000", "north");
        first.address = "old addr".to_string();
        store.bulk_insert_properties(&[first]).await.unwrap();

        let mut second = new_property("1-00001-000", "north");
        second.address = "new addr".to_string();
        let report = store.bulk_insert_properties(&[second]).await.unwrap();

        assert_eq!((report.inserted, report.updated, report.rejected), (0, 1, 0));
        assert!(report.errors.is_empty());
        let property = store
            .get_property_by_parcel("1-00001-000")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(property.address, "new addr");
        assert_eq!(store.count_properties().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_depreciation_lookup() {
        let store = LocalStore::default();
        for (age, percent_good) in [(0, 1.0), (10, 0.85), (20, 0.7), (40, 0.45)] {
            store
                .create_depreciation_schedule(&NewDepreciationSchedule {
                    schedule_type: "R1".into(),
                    effective_age: age,
                    percent_good,
                    source: None,
                })
                .await
                .unwrap();
        }

        for (age, expected) in [(10, 0.85), (12, 0.7), (75, 0.45)] {
            let row = store.find_depreciation("R1", age).await.unwrap().unwrap();
            assert_eq!(row.percent_good, expected, "age {}", age);
        }
        assert_eq!(store.find_depreciation("C3", 5).await.unwrap(), None);

        let err = store
            .create_depreciation_schedule(&NewDepreciationSchedule {
                schedule_type: "R1".into(),
                effective_age: 20,
                percent_good: 0.6,
                source: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_scenarios_newest_first() {
        let store = LocalStore::default();
        for (name, by) in [("base", Some(1)), ("high market", Some(2)), ("low market", Some(1))] {
            store
                .create_scenario(&NewScenario {
                    name: name.into(),
                    description: None,
                    parameters: serde_json::json!({ "market_factor": 1.05 }),
                    results: None,
                    created_by: by,
                })
                .await
                .unwrap();
        }

        let mine = store
            .list_scenarios(&ScenarioFilter {
                created_by: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = mine.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["low market", "base"]);

        let page = store
            .list_scenarios(&ScenarioFilter {
                limit: 1,
                offset: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page[0].name, "high market");

        assert!(store.delete_scenario(mine[0].id).await.unwrap());
        assert!(store.get_scenario(mine[0].id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_upload_lifecycle() {
        let store = LocalStore::default();
        let upload = store
            .create_batch_upload(&NewBatchUpload {
                filename: "benton_2025.csv".into(),
                file_type: "csv".into(),
                created_by: None,
            })
            .await
            .unwrap();
        assert_eq!(upload.status, BatchStatus::Processing);
        assert_eq!(upload.total_records, None);

        let running = BatchProgress {
            status: BatchStatus::Processing,
            total_records: 100,
            processed_records: 98,
            error_records: 2,
            error_log: None,
        };
        let mid = store.update_batch_upload(upload.id, &running).await.unwrap();
        assert_eq!(mid.completed_at, None);

        let done = BatchProgress {
            status: BatchStatus::Completed,
            error_log: Some("Row 7: Missing address".into()),
            ..running
        };
        let finished = store.update_batch_upload(upload.id, &done).await.unwrap();
        assert!(finished.completed_at.is_some());
        assert_eq!(finished.error_records, 2);

        let err = store.update_batch_upload(upload.id, &done).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_batch_uploads().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_calculations_and_summary() {
        let store = LocalStore::default();
        let property = store.create_property(&new_property("P-9", "north")).await.unwrap();

        for value in [100_000.0, 200_000.0] {
            store
                .create_calculation(&NewCalculation {
                    property_id: property.id,
                    region: "north".into(),
                    rcn: value * 1.25,
                    percent_good: 0.8,
                    final_value: value,
                    calculation_chain: serde_json::json!({ "base_cost": 142.5 }),
                    created_by: None,
                })
                .await
                .unwrap();
        }

        let summary = store.summarize_by_region().await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].count, 2);
        assert_eq!(summary[0].avg_value, 150_000.0);

        let orphan = store
            .create_calculation(&NewCalculation {
                property_id: 4242,
                region: "north".into(),
                rcn: 1.0,
                percent_good: 0.5,
                final_value: 0.5,
                calculation_chain: serde_json::Value::Null,
                created_by: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(orphan, StoreError::NotFound { entity: "property", .. }));

        assert!(store.delete_property(property.id).await.unwrap());
        assert!(store
            .list_calculations_for_property(property.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local-store.json");

        let store = LocalStore::open(&path).unwrap();
        let alice = store.create_user(&new_user("alice")).await.unwrap();
        store.create_property(&new_property("P-1", "north")).await.unwrap();
        store.persist().unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.count_users().await.unwrap(), 1);
        assert_eq!(reopened.count_properties().await.unwrap(), 1);

        // Ids continue after the highest restored id.
        let bob = reopened.create_user(&new_user("bob")).await.unwrap();
        assert!(bob.id > alice.id);
        assert!(bob.id > 2);
    }
}
