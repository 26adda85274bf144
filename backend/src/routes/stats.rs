use serde::{Deserialize, Serialize};

use crate::models::PrimaryFuel;

/// Aggregate figures over every renderable facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitySummary {
    pub total_facilities: u64,
    pub total_countries: u64,
    pub fuel_types: u64,
    pub avg_capacity_mw: f64,
    pub total_capacity_mw: f64,
}

impl FacilitySummary {
    pub fn empty() -> Self {
        Self {
            total_facilities: 0,
            total_countries: 0,
            fuel_types: 0,
            avg_capacity_mw: 0.0,
            total_capacity_mw: 0.0,
        }
    }
}

/// Installed capacity for one fuel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelCapacity {
    pub fuel: PrimaryFuel,
    pub capacity_mw: f64,
}

/// Route path constants
pub const GET_FACILITY_SUMMARY: &str = "/facilities/stats/summary";
pub const GET_FUEL_CAPACITY: &str = "/fuels/capacity";
