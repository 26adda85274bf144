//! In-memory local repository implementation.
//!
//! Stores facilities in a `BTreeMap` keyed by id, which gives the id-ascending
//! tiebreak for free when the query builder sorts by capacity. Suitable for
//! unit tests, local development and small seed datasets.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::db::query;
use crate::db::repository::{
    ErrorContext, FacilityRepository, RepositoryError, RepositoryResult, StatsRepository,
};
use crate::models::{Facility, FacilityId, FacilityPage, PrimaryFuel, QueryFilter};
use crate::routes::countries::{CountryEntry, CountryFuelMix};
use crate::routes::stats::{FacilitySummary, FuelCapacity};

/// In-memory local repository.
///
/// # Example
/// ```
/// use gppd_map::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.facility_count(), 0);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    facilities: BTreeMap<FacilityId, Facility>,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            facilities: BTreeMap::new(),
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Create a repository pre-populated with `facilities`.
    pub fn with_facilities(facilities: impl IntoIterator<Item = Facility>) -> Self {
        let repo = Self::new();
        repo.insert_many(facilities);
        repo
    }

    /// Load a JSON array of facilities from disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RepositoryError::configuration(format!(
                "Failed to read seed file {}: {}",
                path.display(),
                e
            ))
        })?;
        let facilities: Vec<Facility> = serde_json::from_str(&content).map_err(|e| {
            RepositoryError::ValidationError {
                message: format!("Invalid facility seed JSON: {}", e),
                context: ErrorContext::new("load_seed").with_details(path.display().to_string()),
            }
        })?;
        log::info!(
            "Loaded {} facilities from {}",
            facilities.len(),
            path.display()
        );
        Ok(Self::with_facilities(facilities))
    }

    /// Insert or replace a facility.
    pub fn insert_facility(&self, facility: Facility) {
        self.data
            .write()
            .facilities
            .insert(facility.id.clone(), facility);
    }

    /// Insert or replace many facilities at once.
    pub fn insert_many(&self, facilities: impl IntoIterator<Item = Facility>) {
        let mut data = self.data.write();
        for facility in facilities {
            data.facilities.insert(facility.id.clone(), facility);
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Remove every facility.
    pub fn clear(&self) {
        self.data.write().facilities.clear();
    }

    pub fn facility_count(&self) -> usize {
        self.data.read().facilities.len()
    }

    fn ensure_healthy(&self, operation: &str) -> RepositoryResult<()> {
        if self.data.read().is_healthy {
            Ok(())
        } else {
            Err(RepositoryError::connection_with_context(
                "Local repository marked unhealthy",
                ErrorContext::new(operation),
            ))
        }
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FacilityRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn query_facilities(&self, query: &QueryFilter) -> RepositoryResult<FacilityPage> {
        self.ensure_healthy("query_facilities")?;
        let data = self.data.read();
        Ok(query::evaluate(query, data.facilities.values()))
    }

    async fn get_facility(&self, id: &FacilityId) -> RepositoryResult<Option<Facility>> {
        self.ensure_healthy("get_facility")?;
        Ok(self.data.read().facilities.get(id).cloned())
    }
}

#[async_trait]
impl StatsRepository for LocalRepository {
    async fn facility_summary(&self) -> RepositoryResult<FacilitySummary> {
        self.ensure_healthy("facility_summary")?;
        let data = self.data.read();

        let mut countries = HashSet::new();
        let mut fuels = HashSet::new();
        let mut count = 0u64;
        let mut total_capacity = 0.0;
        for facility in data.facilities.values().filter(|f| f.is_renderable()) {
            countries.insert(facility.country_code.as_str());
            fuels.insert(facility.primary_fuel);
            count += 1;
            total_capacity += facility.capacity_mw;
        }

        if count == 0 {
            return Ok(FacilitySummary::empty());
        }

        Ok(FacilitySummary {
            total_facilities: count,
            total_countries: countries.len() as u64,
            fuel_types: fuels.len() as u64,
            avg_capacity_mw: total_capacity / count as f64,
            total_capacity_mw: total_capacity,
        })
    }

    async fn capacity_by_fuel(&self) -> RepositoryResult<Vec<FuelCapacity>> {
        self.ensure_healthy("capacity_by_fuel")?;
        let data = self.data.read();

        let mut by_fuel: HashMap<PrimaryFuel, f64> = HashMap::new();
        for facility in data.facilities.values().filter(|f| f.is_renderable()) {
            *by_fuel.entry(facility.primary_fuel).or_insert(0.0) += facility.capacity_mw;
        }

        let mut rows: Vec<FuelCapacity> = by_fuel
            .into_iter()
            .map(|(fuel, capacity_mw)| FuelCapacity { fuel, capacity_mw })
            .collect();
        rows.sort_by(|a, b| {
            b.capacity_mw
                .total_cmp(&a.capacity_mw)
                .then_with(|| a.fuel.cmp(&b.fuel))
        });
        Ok(rows)
    }

    async fn countries(&self) -> RepositoryResult<Vec<CountryEntry>> {
        self.ensure_healthy("countries")?;
        let data = self.data.read();

        let mut names: BTreeMap<String, &str> = BTreeMap::new();
        for facility in data.facilities.values().filter(|f| f.is_renderable()) {
            let name = names
                .entry(facility.country_code.to_ascii_uppercase())
                .or_insert(facility.country_name.as_str());
            if facility.country_name.as_str() < *name {
                *name = facility.country_name.as_str();
            }
        }

        let mut countries: Vec<CountryEntry> = names
            .into_iter()
            .map(|(country_code, name)| CountryEntry {
                country_code,
                country_name: name.to_string(),
            })
            .collect();
        countries.sort_by(|a, b| {
            a.country_name
                .cmp(&b.country_name)
                .then_with(|| a.country_code.cmp(&b.country_code))
        });
        Ok(countries)
    }

    async fn country_fuel_mix(&self, country_code: &str) -> RepositoryResult<Vec<CountryFuelMix>> {
        self.ensure_healthy("country_fuel_mix")?;
        let data = self.data.read();

        let groups = data
            .facilities
            .values()
            .filter(|f| f.is_renderable())
            .filter(|f| f.country_code.eq_ignore_ascii_case(country_code))
            .map(|f| (f.primary_fuel, 1, f.capacity_mw));
        Ok(CountryFuelMix::rollup(groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::SpatialQueryBuilder;

    fn facility(id: &str, capacity: f64, fuel: PrimaryFuel, country: &str) -> Facility {
        Facility {
            id: FacilityId::new(id),
            name: id.to_string(),
            country_code: country.to_string(),
            country_name: country.to_string(),
            capacity_mw: capacity,
            latitude: 10.0,
            longitude: 10.0,
            primary_fuel: fuel,
            commissioning_year: None,
            owner: None,
        }
    }

    #[tokio::test]
    async fn test_insert_replaces_by_id() {
        let repo = LocalRepository::new();
        repo.insert_facility(facility("a", 1.0, PrimaryFuel::Gas, "USA"));
        repo.insert_facility(facility("a", 2.0, PrimaryFuel::Gas, "USA"));
        assert_eq!(repo.facility_count(), 1);
        let f = repo.get_facility(&FacilityId::new("a")).await.unwrap().unwrap();
        assert_eq!(f.capacity_mw, 2.0);
    }

    #[tokio::test]
    async fn test_unhealthy_repository_fails_queries() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        let err = repo
            .query_facilities(&SpatialQueryBuilder::new().build())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_summary_and_fuel_capacity() {
        let repo = LocalRepository::with_facilities(vec![
            facility("a", 100.0, PrimaryFuel::Gas, "USA"),
            facility("b", 300.0, PrimaryFuel::Hydro, "CAN"),
            facility("c", 50.0, PrimaryFuel::Gas, "USA"),
            facility("d", 0.0, PrimaryFuel::Coal, "MEX"),
        ]);

        let summary = repo.facility_summary().await.unwrap();
        assert_eq!(summary.total_facilities, 3);
        assert_eq!(summary.total_countries, 2);
        assert_eq!(summary.fuel_types, 2);
        assert_eq!(summary.total_capacity_mw, 450.0);
        assert_eq!(summary.avg_capacity_mw, 150.0);

        let fuels = repo.capacity_by_fuel().await.unwrap();
        assert_eq!(fuels.len(), 2);
        assert_eq!(fuels[0].fuel, PrimaryFuel::Hydro);
        assert_eq!(fuels[1].capacity_mw, 150.0);
    }

    #[tokio::test]
    async fn test_countries_sorted_by_name() {
        let repo = LocalRepository::with_facilities(vec![
            facility("a", 100.0, PrimaryFuel::Gas, "usa"),
            facility("b", 300.0, PrimaryFuel::Hydro, "CAN"),
            facility("c", 50.0, PrimaryFuel::Gas, "USA"),
            facility("d", 0.0, PrimaryFuel::Coal, "MEX"),
        ]);
        let codes: Vec<String> = repo
            .countries()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.country_code)
            .collect();
        // Codes merge case-insensitively; the zero-capacity row contributes nothing.
        assert_eq!(codes, vec!["CAN", "USA"]);
    }

    #[tokio::test]
    async fn test_country_fuel_mix() {
        let repo = LocalRepository::with_facilities(vec![
            facility("a", 100.0, PrimaryFuel::Gas, "USA"),
            facility("b", 300.0, PrimaryFuel::Hydro, "CAN"),
            facility("c", 50.0, PrimaryFuel::Gas, "USA"),
            facility("d", 400.0, PrimaryFuel::Solar, "USA"),
        ]);
        let mix = repo.country_fuel_mix("USA").await.unwrap();
        assert_eq!(mix.len(), 2);
        assert_eq!(mix[0].fuel, PrimaryFuel::Solar);
        assert_eq!(mix[1].fuel, PrimaryFuel::Gas);
        assert_eq!(mix[1].facility_count, 2);
        assert_eq!(mix[1].avg_capacity_mw, 75.0);

        assert!(repo.country_fuel_mix("ZZZ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_summary() {
        let repo = LocalRepository::new();
        assert_eq!(
            repo.facility_summary().await.unwrap(),
            FacilitySummary::empty()
        );
    }
}
