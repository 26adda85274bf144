use serde::{Deserialize, Serialize};

use super::bounds::ViewportBounds;
use super::facility::Facility;
use super::fuel::PrimaryFuel;

/// Default page size used by the query endpoint and by sweeps.
pub const DEFAULT_PAGE_LIMIT: u32 = 2000;
/// Largest page the query endpoint will return.
pub const MAX_PAGE_LIMIT: u32 = 10_000;

/// What a sweep targets: filters plus an optional viewport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityFilter {
    #[serde(default)]
    pub bounds: Option<ViewportBounds>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub fuel: Option<PrimaryFuel>,
}

impl FacilityFilter {
    pub fn with_bounds(mut self, bounds: ViewportBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into().trim().to_ascii_uppercase());
        self
    }

    pub fn with_fuel(mut self, fuel: PrimaryFuel) -> Self {
        self.fuel = Some(fuel);
        self
    }
}

/// Filter plus one page window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub filter: FacilityFilter,
    pub limit: u32,
    pub offset: u64,
}

impl QueryFilter {
    pub fn new(filter: FacilityFilter, limit: u32, offset: u64) -> Self {
        Self {
            filter,
            limit: limit.min(MAX_PAGE_LIMIT),
            offset,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityPage {
    pub facilities: Vec<Facility>,
    /// Matching rows for the whole predicate, independent of limit/offset.
    pub total: u64,
    /// Bounds that were actually applied, if any.
    pub bounds: Option<ViewportBounds>,
}
