use serde::{Deserialize, Serialize};
use std::fmt;

use super::bounds::{MAX_LATITUDE, MAX_LONGITUDE, MIN_LATITUDE, MIN_LONGITUDE};
use super::fuel::PrimaryFuel;

/// Facility identifier (GPPD `gppd_idnr`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(pub String);

impl FacilityId {
    pub fn new(value: impl Into<String>) -> Self {
        FacilityId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FacilityId {
    fn from(value: &str) -> Self {
        FacilityId(value.to_string())
    }
}

/// A geolocated generating facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    /// ISO 3166-1 alpha-3 code, upper case.
    pub country_code: String,
    pub country_name: String,
    pub capacity_mw: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub primary_fuel: PrimaryFuel,
    #[serde(default)]
    pub commissioning_year: Option<i32>,
    #[serde(default)]
    pub owner: Option<String>,
}

impl Facility {
    /// Finite in-range coordinates and a positive capacity.
    pub fn is_renderable(&self) -> bool {
        is_renderable(self.capacity_mw, self.latitude, self.longitude)
    }
}

/// Shared validity rule for anything placed on the map.
pub fn is_renderable(capacity_mw: f64, latitude: f64, longitude: f64) -> bool {
    capacity_mw.is_finite()
        && capacity_mw > 0.0
        && latitude.is_finite()
        && longitude.is_finite()
        && (MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
        && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
}
