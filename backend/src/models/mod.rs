//! Domain model: facilities, fuels, viewport bounds and query windows.

pub mod bounds;
pub mod facility;
pub mod fuel;
pub mod query;

pub use bounds::{BoundsParseError, ViewportBounds};
pub use facility::{is_renderable, Facility, FacilityId};
pub use fuel::PrimaryFuel;
pub use query::{FacilityFilter, FacilityPage, QueryFilter, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
