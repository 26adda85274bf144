use serde::{Deserialize, Serialize};

use crate::models::{is_renderable, Facility, FacilityPage, PrimaryFuel, ViewportBounds};

/// Wire shape of a single facility.
///
/// `id` is optional on the wire: clients must cope with rows that lack a
/// stable identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub country_code: String,
    pub country_name: String,
    pub capacity_mw: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub primary_fuel: PrimaryFuel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commissioning_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl FacilityRow {
    /// Finite in-range coordinates and a positive capacity.
    pub fn is_renderable(&self) -> bool {
        is_renderable(self.capacity_mw as f64, self.latitude, self.longitude)
    }

    /// The identifier when it is usable for deduplication.
    pub fn stable_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

impl From<&Facility> for FacilityRow {
    fn from(facility: &Facility) -> Self {
        Self {
            id: Some(facility.id.to_string()),
            name: facility.name.clone(),
            country_code: facility.country_code.clone(),
            country_name: facility.country_name.clone(),
            capacity_mw: round_capacity(facility.capacity_mw),
            latitude: round_coordinate(facility.latitude),
            longitude: round_coordinate(facility.longitude),
            primary_fuel: facility.primary_fuel,
            commissioning_year: facility.commissioning_year,
            owner: facility.owner.clone(),
        }
    }
}

/// Response body of the spatial query endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityPageResponse {
    pub rows: Vec<FacilityRow>,
    /// Number of rows in this page.
    pub count: usize,
    /// Number of rows matching the predicate across all pages.
    pub total: u64,
    /// Bounds that were applied, or `null` when bounds filtering was disabled.
    pub bounds: Option<ViewportBounds>,
}

impl From<FacilityPage> for FacilityPageResponse {
    fn from(page: FacilityPage) -> Self {
        let rows: Vec<FacilityRow> = page.facilities.iter().map(FacilityRow::from).collect();
        Self {
            count: rows.len(),
            rows,
            total: page.total,
            bounds: page.bounds,
        }
    }
}

/// Capacity in whole megawatts. Positive sub-megawatt plants stay at 1 MW so
/// they remain renderable.
pub fn round_capacity(capacity_mw: f64) -> i64 {
    let rounded = capacity_mw.round() as i64;
    if capacity_mw > 0.0 {
        rounded.max(1)
    } else {
        rounded
    }
}

/// Coordinates are published with 4 decimal places (~11 m).
pub fn round_coordinate(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Route path constants
pub const LIST_FACILITIES: &str = "/facilities";
pub const GET_FACILITY: &str = "/facilities/{facility_id}";
