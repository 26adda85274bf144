use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::PrimaryFuel;

/// One country present in the facility table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryEntry {
    pub country_code: String,
    pub country_name: String,
}

/// Countries for the country filter, ordered by display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryListResponse {
    pub countries: Vec<CountryEntry>,
    pub count: usize,
}

impl From<Vec<CountryEntry>> for CountryListResponse {
    fn from(countries: Vec<CountryEntry>) -> Self {
        Self {
            count: countries.len(),
            countries,
        }
    }
}

/// Facilities and capacity of one fuel within a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryFuelMix {
    pub fuel: PrimaryFuel,
    pub facility_count: u64,
    pub total_capacity_mw: f64,
    pub avg_capacity_mw: f64,
}

impl CountryFuelMix {
    /// Fold `(fuel, facility_count, capacity_mw)` groups into one entry per
    /// fuel, largest total capacity first.
    pub fn rollup(groups: impl IntoIterator<Item = (PrimaryFuel, u64, f64)>) -> Vec<Self> {
        let mut by_fuel: BTreeMap<PrimaryFuel, (u64, f64)> = BTreeMap::new();
        for (fuel, count, capacity_mw) in groups {
            let entry = by_fuel.entry(fuel).or_insert((0, 0.0));
            entry.0 += count;
            entry.1 += capacity_mw;
        }

        let mut mix: Vec<Self> = by_fuel
            .into_iter()
            .filter(|(_, (count, _))| *count > 0)
            .map(|(fuel, (count, total))| Self {
                fuel,
                facility_count: count,
                total_capacity_mw: total,
                avg_capacity_mw: total / count as f64,
            })
            .collect();
        mix.sort_by(|a, b| {
            b.total_capacity_mw
                .total_cmp(&a.total_capacity_mw)
                .then_with(|| a.fuel.cmp(&b.fuel))
        });
        mix
    }
}

/// Fuel mix of a single country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryFuelsResponse {
    pub country_code: String,
    pub fuels: Vec<CountryFuelMix>,
}

/// Route path constants
pub const LIST_COUNTRIES: &str = "/countries/summary";
pub const GET_COUNTRY_FUELS: &str = "/countries/{country}/fuels";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollup_merges_groups_of_the_same_fuel() {
        let mix = CountryFuelMix::rollup(vec![
            (PrimaryFuel::Hydro, 2, 300.0),
            (PrimaryFuel::Other, 1, 10.0),
            (PrimaryFuel::Coal, 1, 500.0),
            (PrimaryFuel::Other, 3, 20.0),
        ]);
        assert_eq!(mix.len(), 3);
        assert_eq!(mix[0].fuel, PrimaryFuel::Coal);
        assert_eq!(mix[1].avg_capacity_mw, 150.0);
        assert_eq!(mix[2].fuel, PrimaryFuel::Other);
        assert_eq!(mix[2].facility_count, 4);
        assert_eq!(mix[2].avg_capacity_mw, 7.5);
    }

    #[test]
    fn test_rollup_of_nothing_is_empty() {
        assert!(CountryFuelMix::rollup(Vec::new()).is_empty());
    }

    #[test]
    fn test_country_list_counts_entries() {
        let list = CountryListResponse::from(vec![CountryEntry {
            country_code: "NPL".into(),
            country_name: "Nepal".into(),
        }]);
        assert_eq!(list.count, 1);
    }
}
