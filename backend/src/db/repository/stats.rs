//! Aggregate statistics over the facility table.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::routes::countries::{CountryEntry, CountryFuelMix};
use crate::routes::stats::{FacilitySummary, FuelCapacity};

/// Summary queries backing the dashboard counters and the fuel legend.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Facility count, distinct countries and fuels, and capacity totals.
    async fn facility_summary(&self) -> RepositoryResult<FacilitySummary>;

    /// Installed capacity grouped by primary fuel, largest first.
    async fn capacity_by_fuel(&self) -> RepositoryResult<Vec<FuelCapacity>>;

    /// Countries with at least one renderable facility, by display name.
    async fn countries(&self) -> RepositoryResult<Vec<CountryEntry>>;

    /// Fuel mix of the country with the given upper-case code, largest
    /// total capacity first. Unknown countries yield an empty list.
    async fn country_fuel_mix(&self, country_code: &str) -> RepositoryResult<Vec<CountryFuelMix>>;
}
