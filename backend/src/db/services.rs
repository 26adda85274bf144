//! High-level database service layer.
//!
//! Repository-agnostic operations used by the HTTP handlers and the
//! in-process page fetcher. Functions accept any `FullRepository`, including
//! `dyn FullRepository` behind an `Arc`.
//!
//! # Usage
//!
//! ```no_run
//! use gppd_map::db::{query::SpatialQueryBuilder, repositories::LocalRepository, services};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let query = SpatialQueryBuilder::new().bounds("-10,35,30,60").limit(500).build();
//!     let page = services::query_facilities(&repo, &query).await?;
//!     println!("{} of {} facilities", page.facilities.len(), page.total);
//!     Ok(())
//! }
//! ```

use log::{debug, info};

use super::repository::{ErrorContext, FullRepository, RepositoryError, RepositoryResult};
use crate::models::{Facility, FacilityId, FacilityPage, QueryFilter};
use crate::routes::countries::{CountryEntry, CountryFuelMix};
use crate::routes::stats::{FacilitySummary, FuelCapacity};

// ==================== Health & Connection ====================

pub async fn health_check<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Facility Queries ====================

/// Run one page of a spatial query.
pub async fn query_facilities<R: FullRepository + ?Sized>(
    repo: &R,
    query: &QueryFilter,
) -> RepositoryResult<FacilityPage> {
    let page = repo.query_facilities(query).await?;
    debug!(
        "query_facilities: bounds={} country={:?} fuel={:?} offset={} limit={} -> {} of {}",
        query
            .filter
            .bounds
            .map(|b| b.to_string())
            .unwrap_or_else(|| "none".to_string()),
        query.filter.country,
        query.filter.fuel,
        query.offset,
        query.limit,
        page.facilities.len(),
        page.total
    );
    Ok(page)
}

/// Fetch a single facility, failing with `NotFound` when the id is unknown.
pub async fn get_facility<R: FullRepository + ?Sized>(
    repo: &R,
    id: &FacilityId,
) -> RepositoryResult<Facility> {
    repo.get_facility(id).await?.ok_or_else(|| {
        RepositoryError::not_found_with_context(
            format!("Facility {} not found", id),
            ErrorContext::new("get_facility")
                .with_entity("facility")
                .with_entity_id(id),
        )
    })
}

// ==================== Statistics ====================

pub async fn facility_summary<R: FullRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<FacilitySummary> {
    let summary = repo.facility_summary().await?;
    info!(
        "Facility summary: {} facilities across {} countries",
        summary.total_facilities, summary.total_countries
    );
    Ok(summary)
}

/// Installed capacity per fuel, largest first.
pub async fn capacity_by_fuel<R: FullRepository + ?Sized>(
    repo: &R,
) -> RepositoryResult<Vec<FuelCapacity>> {
    repo.capacity_by_fuel().await
}

// ==================== Countries ====================

/// Countries available to the country filter.
pub async fn countries<R: FullRepository + ?Sized>(repo: &R) -> RepositoryResult<Vec<CountryEntry>> {
    let countries = repo.countries().await?;
    debug!("countries: {}", countries.len());
    Ok(countries)
}

/// Upper-case country code as stored, or `None` when blank.
pub fn normalize_country_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    (!code.is_empty()).then_some(code)
}

/// Fuel mix of one country. `country_code` is matched case-insensitively.
pub async fn country_fuel_mix<R: FullRepository + ?Sized>(
    repo: &R,
    country_code: &str,
) -> RepositoryResult<Vec<CountryFuelMix>> {
    let code = normalize_country_code(country_code).ok_or_else(|| {
        RepositoryError::ValidationError {
            message: "Country code must not be empty".to_string(),
            context: ErrorContext::new("country_fuel_mix").with_entity("country"),
        }
    })?;
    let mix = repo.country_fuel_mix(&code).await?;
    debug!("country_fuel_mix: {} -> {} fuels", code, mix.len());
    Ok(mix)
}
