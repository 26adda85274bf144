//! Data Transfer Objects for the HTTP API.
//!
//! Response bodies live in `routes/` and are re-exported here; this module
//! adds the request-side types.

use serde::{Deserialize, Serialize};

use crate::db::query::SpatialQueryBuilder;
use crate::models::QueryFilter;

pub use crate::api::{FacilityPageResponse, FacilityRow, FacilitySummary, FuelCapacity};

/// Query string of `GET /v1/facilities`.
///
/// Every parameter is optional. Unparseable or non-finite `bounds` disable
/// bounds filtering instead of failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacilityQuery {
    #[serde(default)]
    pub bounds: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub fuel: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u64>,
}

impl FacilityQuery {
    pub fn into_filter(self) -> QueryFilter {
        let mut builder = SpatialQueryBuilder::new();
        if let Some(bounds) = self.bounds {
            builder = builder.bounds(bounds);
        }
        if let Some(country) = self.country {
            builder = builder.country(country);
        }
        if let Some(fuel) = self.fuel {
            builder = builder.fuel(fuel);
        }
        if let Some(limit) = self.limit {
            builder = builder.limit(limit);
        }
        if let Some(offset) = self.offset {
            builder = builder.offset(offset);
        }
        builder.build()
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrimaryFuel, DEFAULT_PAGE_LIMIT};

    #[test]
    fn test_empty_query_uses_defaults() {
        let filter = FacilityQuery::default().into_filter();
        assert_eq!(filter.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(filter.offset, 0);
        assert!(filter.filter.bounds.is_none());
    }

    #[test]
    fn test_query_maps_every_parameter() {
        let filter = FacilityQuery {
            bounds: Some("-10,35,30,60".into()),
            country: Some("fra".into()),
            fuel: Some("nuclear".into()),
            limit: Some(10),
            offset: Some(20),
        }
        .into_filter();
        assert!(filter.filter.bounds.is_some());
        assert_eq!(filter.filter.country.as_deref(), Some("FRA"));
        assert_eq!(filter.filter.fuel, Some(PrimaryFuel::Nuclear));
        assert_eq!((filter.limit, filter.offset), (10, 20));
    }
}
