//! Facility repository trait: spatial queries and lookups.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{Facility, FacilityId, FacilityPage, QueryFilter};

/// Read access to facility records.
///
/// The query path is read-only and stateless per call; implementations need
/// no coordination between concurrent requests beyond their storage's default
/// read consistency.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait FacilityRepository: Send + Sync {
    /// Check that the backing store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Run one page of a spatial query.
    ///
    /// The page honours the predicate and ordering defined in
    /// [`crate::db::query`]; `total` counts every matching row regardless of
    /// `limit`/`offset`, and an offset past the end yields an empty page.
    async fn query_facilities(&self, query: &QueryFilter) -> RepositoryResult<FacilityPage>;

    /// Fetch a single facility by id.
    ///
    /// # Returns
    /// * `Ok(None)` - No facility with that id
    async fn get_facility(&self, id: &FacilityId) -> RepositoryResult<Option<Facility>>;
}
