//! Spatial query builder.
//!
//! Turns raw request parameters (bounds string, country, fuel, limit, offset)
//! into a normalised [`QueryFilter`] and defines the predicate and ordering
//! every repository must honour:
//!
//! - rows always have `capacity > 0` and finite in-range coordinates;
//! - bounds are all-or-nothing, with disjunctive longitude when `west > east`;
//! - ordering is capacity descending, then facility id ascending;
//! - `total` counts the whole predicate, independent of limit/offset.
//!
//! The in-memory repository evaluates [`evaluate`] directly; the Postgres
//! repository translates the same predicate into SQL.

use std::cmp::Ordering;

use crate::models::{
    Facility, FacilityFilter, FacilityPage, PrimaryFuel, QueryFilter, ViewportBounds,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};

/// Builder for [`QueryFilter`] from untrusted request parameters.
#[derive(Debug, Clone, Default)]
pub struct SpatialQueryBuilder {
    bounds: Option<String>,
    country: Option<String>,
    fuel: Option<String>,
    limit: Option<u32>,
    offset: Option<u64>,
}

impl SpatialQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw `"west,south,east,north"` value.
    pub fn bounds(mut self, raw: impl Into<String>) -> Self {
        self.bounds = Some(raw.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn fuel(mut self, fuel: impl Into<String>) -> Self {
        self.fuel = Some(fuel.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn build(self) -> QueryFilter {
        let bounds = self.bounds.as_deref().and_then(ViewportBounds::from_query);

        let country = self
            .country
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty());

        let fuel = self
            .fuel
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(PrimaryFuel::from_label);

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if limit > MAX_PAGE_LIMIT {
            log::debug!("Clamping page limit {} to {}", limit, MAX_PAGE_LIMIT);
        }

        QueryFilter::new(
            FacilityFilter {
                bounds,
                country,
                fuel,
            },
            limit,
            self.offset.unwrap_or(0),
        )
    }
}

/// Whether `facility` satisfies the filter, including the always-on validity rules.
pub fn matches(filter: &FacilityFilter, facility: &Facility) -> bool {
    if !facility.is_renderable() {
        return false;
    }
    if let Some(bounds) = &filter.bounds {
        if !bounds.contains(facility.latitude, facility.longitude) {
            return false;
        }
    }
    if let Some(country) = &filter.country {
        if !facility.country_code.eq_ignore_ascii_case(country) {
            return false;
        }
    }
    if let Some(fuel) = filter.fuel {
        if facility.primary_fuel != fuel {
            return false;
        }
    }
    true
}

/// Capacity descending, ties broken by id ascending.
pub fn display_order(a: &Facility, b: &Facility) -> Ordering {
    b.capacity_mw
        .total_cmp(&a.capacity_mw)
        .then_with(|| a.id.cmp(&b.id))
}

/// Evaluate a query against an in-memory collection.
pub fn evaluate<'a, I>(query: &QueryFilter, facilities: I) -> FacilityPage
where
    I: IntoIterator<Item = &'a Facility>,
{
    let mut matching: Vec<&Facility> = facilities
        .into_iter()
        .filter(|f| matches(&query.filter, f))
        .collect();
    matching.sort_by(|a, b| display_order(a, b));

    let total = matching.len() as u64;
    let start = usize::try_from(query.offset).unwrap_or(usize::MAX);
    let page = matching
        .into_iter()
        .skip(start)
        .take(query.limit as usize)
        .cloned()
        .collect();

    FacilityPage {
        facilities: page,
        total,
        bounds: query.filter.bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FacilityId;

    fn facility(id: &str, capacity: f64, lat: f64, lng: f64) -> Facility {
        Facility {
            id: FacilityId::new(id),
            name: format!("Plant {id}"),
            country_code: "USA".into(),
            country_name: "United States of America".into(),
            capacity_mw: capacity,
            latitude: lat,
            longitude: lng,
            primary_fuel: PrimaryFuel::Gas,
            commissioning_year: None,
            owner: None,
        }
    }

    #[test]
    fn test_builder_defaults() {
        let q = SpatialQueryBuilder::new().build();
        assert_eq!(q.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(q.offset, 0);
        assert_eq!(q.filter, FacilityFilter::default());
    }

    #[test]
    fn test_builder_normalises_params() {
        let q = SpatialQueryBuilder::new()
            .bounds("0,0,10,10")
            .country(" usa ")
            .fuel("hydro")
            .limit(50_000)
            .offset(7)
            .build();
        assert!(q.filter.bounds.is_some());
        assert_eq!(q.filter.country.as_deref(), Some("USA"));
        assert_eq!(q.filter.fuel, Some(PrimaryFuel::Hydro));
        assert_eq!(q.limit, MAX_PAGE_LIMIT);
        assert_eq!(q.offset, 7);
    }

    #[test]
    fn test_builder_ignores_invalid_bounds_wholesale() {
        let q = SpatialQueryBuilder::new().bounds("0,0,NaN,10").build();
        assert!(q.filter.bounds.is_none());
        let q = SpatialQueryBuilder::new().bounds("").country("").fuel(" ").build();
        assert_eq!(q.filter, FacilityFilter::default());
    }

    #[test]
    fn test_invalid_rows_never_match() {
        let filter = FacilityFilter::default();
        assert!(!matches(&filter, &facility("a", 0.0, 1.0, 1.0)));
        assert!(!matches(&filter, &facility("b", 5.0, f64::NAN, 1.0)));
        assert!(matches(&filter, &facility("c", 5.0, 1.0, 1.0)));
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let rows = [
            facility("b", 100.0, 0.0, 0.0),
            facility("a", 100.0, 0.0, 0.0),
            facility("c", 500.0, 0.0, 0.0),
        ];
        let q = SpatialQueryBuilder::new().build();
        let page = evaluate(&q, rows.iter());
        let ids: Vec<_> = page.facilities.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_total_independent_of_window_and_offset_past_end() {
        let rows: Vec<_> = (0..5)
            .map(|i| facility(&format!("f{i}"), 10.0 + i as f64, 0.0, 0.0))
            .collect();

        let q = SpatialQueryBuilder::new().limit(2).offset(1).build();
        let page = evaluate(&q, rows.iter());
        assert_eq!(page.facilities.len(), 2);
        assert_eq!(page.total, 5);

        let q = SpatialQueryBuilder::new().limit(2).offset(99).build();
        let page = evaluate(&q, rows.iter());
        assert!(page.facilities.is_empty());
        assert_eq!(page.total, 5);
    }

    #[test]
    fn test_zero_limit_is_count_only() {
        let rows = [facility("a", 1.0, 0.0, 0.0)];
        let q = SpatialQueryBuilder::new().limit(0).build();
        let page = evaluate(&q, rows.iter());
        assert!(page.facilities.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_wraparound_bounds_filter() {
        let rows = [
            facility("east", 10.0, 15.0, 175.0),
            facility("west", 10.0, 15.0, -175.0),
            facility("far", 10.0, 15.0, 0.0),
        ];
        let q = SpatialQueryBuilder::new().bounds("170,10,-170,20").build();
        let page = evaluate(&q, rows.iter());
        assert_eq!(page.total, 2);
        assert!(page.bounds.unwrap().wraps_antimeridian());
    }
}
