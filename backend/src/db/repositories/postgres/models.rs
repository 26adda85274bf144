use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Nullable, Text};

use super::schema::power_plants;
use crate::models::{Facility, FacilityId, PrimaryFuel};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = power_plants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PowerPlantRow {
    pub gppd_idnr: String,
    pub name: String,
    pub country: String,
    pub country_long: String,
    pub capacity_mw: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub primary_fuel: Option<String>,
    pub commissioning_year: Option<i32>,
    pub owner: Option<String>,
}

impl PowerPlantRow {
    /// Rows reaching this point already passed the validity predicate, so the
    /// nullable numeric columns are present.
    pub fn into_facility(self) -> Facility {
        Facility {
            id: FacilityId(self.gppd_idnr),
            name: self.name,
            country_code: self.country,
            country_name: self.country_long,
            capacity_mw: self.capacity_mw.unwrap_or(0.0),
            latitude: self.latitude.unwrap_or(f64::NAN),
            longitude: self.longitude.unwrap_or(f64::NAN),
            primary_fuel: self
                .primary_fuel
                .as_deref()
                .map(PrimaryFuel::from_label)
                .unwrap_or(PrimaryFuel::Other),
            commissioning_year: self.commissioning_year,
            owner: self.owner,
        }
    }
}

#[derive(Debug, Clone, QueryableByName)]
pub struct SummaryRow {
    #[diesel(sql_type = BigInt)]
    pub total_facilities: i64,
    #[diesel(sql_type = BigInt)]
    pub total_countries: i64,
    #[diesel(sql_type = Double)]
    pub total_capacity_mw: f64,
}

#[derive(Debug, Clone, QueryableByName)]
pub struct FuelCapacityRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub primary_fuel: Option<String>,
    #[diesel(sql_type = Double)]
    pub capacity_mw: f64,
}

#[derive(Debug, Clone, QueryableByName)]
pub struct CountryRow {
    #[diesel(sql_type = Text)]
    pub country: String,
    #[diesel(sql_type = Text)]
    pub country_long: String,
}

#[derive(Debug, Clone, QueryableByName)]
pub struct FuelMixRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub primary_fuel: Option<String>,
    #[diesel(sql_type = BigInt)]
    pub facility_count: i64,
    #[diesel(sql_type = Double)]
    pub capacity_mw: f64,
}
