//! Public API surface for the map backend.
//!
//! This file consolidates the DTO types for the HTTP API together with the
//! domain types they are built from. All types derive Serialize/Deserialize
//! for JSON serialization.

pub use crate::routes::countries::{
    CountryEntry, CountryFuelMix, CountryFuelsResponse, CountryListResponse,
};
pub use crate::routes::facilities::FacilityPageResponse;
pub use crate::routes::facilities::FacilityRow;
pub use crate::routes::stats::FacilitySummary;
pub use crate::routes::stats::FuelCapacity;

pub use crate::models::{
    Facility, FacilityFilter, FacilityId, FacilityPage, PrimaryFuel, QueryFilter, ViewportBounds,
};
