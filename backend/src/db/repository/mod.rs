//! Repository trait definitions for database operations.
//!
//! - [`error`]: Error types for repository operations
//! - [`facility`]: Spatial queries and single-facility lookups
//! - [`stats`]: Aggregate statistics
//!
//! For functions that need every capability, use the [`FullRepository`] bound:
//!
//! ```ignore
//! async fn load<R: FullRepository + ?Sized>(repo: &R, q: &QueryFilter) -> RepositoryResult<()> {
//!     let page = repo.query_facilities(q).await?;
//!     let summary = repo.facility_summary().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod facility;
pub mod stats;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use facility::FacilityRepository;
pub use stats::StatsRepository;

/// Composite trait bound for a complete repository implementation.
pub trait FullRepository: FacilityRepository + StatsRepository {}

// Blanket implementation: anything implementing both traits is a FullRepository
impl<T> FullRepository for T where T: FacilityRepository + StatsRepository {}
