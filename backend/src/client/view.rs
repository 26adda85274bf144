//! Map view pipeline: sweep, dedup, viewport filter, cluster, render state.
//!
//! [`MapView`] keeps the last good [`RenderState`]. A failed or superseded
//! sweep never replaces it.

use parking_lot::RwLock;
use std::sync::Arc;

use super::cluster::{cluster, Glyph, GridConfig};
use super::config::MapConfig;
use super::error::{ConfigError, SweepError};
use super::fetcher::PageFetcher;
use super::sweep::{SweepConfig, SweepController, SweepOutcome, SweepSnapshot};
use super::viewport::ViewportFilter;
use crate::models::{FacilityFilter, ViewportBounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// No facility in the viewport.
    Empty,
    Complete,
    /// The budget could not be met at the coarsest grid; only `shown` of
    /// `available` facilities are drawn.
    Degraded { shown: usize, available: usize },
}

/// What the renderer should draw for one committed sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub generation: u64,
    pub bounds: Option<ViewportBounds>,
    /// Glyphs to draw, in cell order.
    pub glyphs: Vec<Glyph>,
    /// Glyphs left out to respect the budget.
    pub overflow: Vec<Glyph>,
    pub cell_size_deg: f64,
    /// Facilities represented by `glyphs`.
    pub shown: usize,
    /// Facilities that passed the viewport filter.
    pub available: usize,
    pub status: RenderStatus,
    /// The sweep hit its page cap before reaching the declared total.
    pub sweep_truncated: bool,
}

impl RenderState {
    pub fn build(snapshot: &SweepSnapshot, grid: &GridConfig) -> Self {
        let bounds = snapshot.filter.bounds;
        let candidates = ViewportFilter::new(bounds).apply(&snapshot.rows);
        let available = candidates.len();

        if available == 0 {
            return Self {
                generation: snapshot.generation,
                bounds,
                glyphs: Vec::new(),
                overflow: Vec::new(),
                cell_size_deg: grid.base_cell_deg,
                shown: 0,
                available: 0,
                status: RenderStatus::Empty,
                sweep_truncated: snapshot.truncated,
            };
        }

        let clustering = cluster(candidates, grid);
        let (glyphs, overflow) = if clustering.within_budget {
            (clustering.glyphs, Vec::new())
        } else {
            split_to_budget(clustering.glyphs, grid.budget)
        };

        let shown = glyphs.iter().map(Glyph::member_count).sum();
        let status = if overflow.is_empty() {
            RenderStatus::Complete
        } else {
            RenderStatus::Degraded { shown, available }
        };

        Self {
            generation: snapshot.generation,
            bounds,
            glyphs,
            overflow,
            cell_size_deg: clustering.cell_size_deg,
            shown,
            available,
            status,
            sweep_truncated: snapshot.truncated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status == RenderStatus::Empty
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, RenderStatus::Degraded { .. })
    }
}

/// Keep the `budget` most populous glyphs, both halves in cell order.
fn split_to_budget(mut glyphs: Vec<Glyph>, budget: usize) -> (Vec<Glyph>, Vec<Glyph>) {
    glyphs.sort_by(|a, b| {
        b.member_count()
            .cmp(&a.member_count())
            .then_with(|| a.cell().cmp(&b.cell()))
    });
    let mut overflow = glyphs.split_off(budget.min(glyphs.len()));
    glyphs.sort_by_key(Glyph::cell);
    overflow.sort_by_key(Glyph::cell);
    (glyphs, overflow)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    Rendered(Arc<RenderState>),
    /// A newer request owns the view; nothing changed.
    Superseded,
    /// The sweep failed; `retained` is the state still on screen.
    Failed {
        error: SweepError,
        retained: Option<Arc<RenderState>>,
    },
}

/// Drives sweeps for viewport changes and holds the render state.
pub struct MapView<F: ?Sized> {
    sweeps: SweepController<F>,
    grid: GridConfig,
    rendered: RwLock<Option<Arc<RenderState>>>,
}

impl<F: PageFetcher + ?Sized> MapView<F> {
    pub fn new(fetcher: Arc<F>, config: &MapConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sweeps: SweepController::new(fetcher, SweepConfig::from(config)),
            grid: GridConfig::from(config),
            rendered: RwLock::new(None),
        })
    }

    pub fn sweeps(&self) -> &SweepController<F> {
        &self.sweeps
    }

    /// The state currently on screen.
    pub fn current(&self) -> Option<Arc<RenderState>> {
        self.rendered.read().clone()
    }

    pub fn last_error(&self) -> Option<SweepError> {
        self.sweeps.last_error()
    }

    /// Viewport changed: sweep `filter` restricted to `bounds`.
    pub async fn set_viewport(
        &self,
        bounds: Option<ViewportBounds>,
        filter: FacilityFilter,
    ) -> ViewUpdate {
        let filter = FacilityFilter { bounds, ..filter };
        let outcome = self.sweeps.sweep(filter).await;
        self.apply(outcome)
    }

    /// Retry the last failed request if it still belongs to the latest sweep.
    pub async fn retry(&self) -> Option<ViewUpdate> {
        let outcome = self.sweeps.retry_failed().await?;
        Some(self.apply(outcome))
    }

    fn apply(&self, outcome: SweepOutcome) -> ViewUpdate {
        match outcome {
            SweepOutcome::Committed(snapshot) => {
                let state = Arc::new(RenderState::build(&snapshot, &self.grid));
                let mut rendered = self.rendered.write();
                let newer = rendered
                    .as_ref()
                    .map_or(true, |current| current.generation <= state.generation);
                if !newer {
                    return ViewUpdate::Superseded;
                }
                *rendered = Some(state.clone());
                ViewUpdate::Rendered(state)
            }
            SweepOutcome::Superseded { .. } => ViewUpdate::Superseded,
            SweepOutcome::Failed(error) => ViewUpdate::Failed {
                error,
                retained: self.current(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FacilityRow;
    use crate::models::PrimaryFuel;

    fn row(id: &str, lat: f64, lng: f64) -> FacilityRow {
        FacilityRow {
            id: Some(id.into()),
            name: id.into(),
            country_code: "AUS".into(),
            country_name: "Australia".into(),
            capacity_mw: 100,
            latitude: lat,
            longitude: lng,
            primary_fuel: PrimaryFuel::Solar,
            commissioning_year: None,
            owner: None,
        }
    }

    fn snapshot(rows: Vec<FacilityRow>, bounds: Option<ViewportBounds>) -> SweepSnapshot {
        SweepSnapshot {
            generation: 1,
            filter: FacilityFilter {
                bounds,
                ..FacilityFilter::default()
            },
            declared_total: rows.len() as u64,
            rows,
            pages: 1,
            duplicates: 0,
            truncated: false,
        }
    }

    #[test]
    fn test_empty_viewport_is_explicit() {
        let bounds = ViewportBounds::from_query("0,0,1,1");
        let state = RenderState::build(
            &snapshot(vec![row("far", -30.0, 150.0)], bounds),
            &GridConfig::default(),
        );
        assert!(state.is_empty());
        assert_eq!(state.available, 0);
    }

    #[test]
    fn test_degraded_render_flags_truncation() {
        let rows = vec![
            row("a", 45.0, 90.0),
            row("b", 46.0, 91.0),
            row("c", -45.0, -90.0),
        ];
        let grid = GridConfig {
            budget: 1,
            ..GridConfig::default()
        };
        let state = RenderState::build(&snapshot(rows, None), &grid);
        assert_eq!(state.glyphs.len(), 1);
        assert_eq!(state.overflow.len(), 1);
        assert_eq!(
            state.status,
            RenderStatus::Degraded {
                shown: 2,
                available: 3
            }
        );
        assert_eq!(state.cell_size_deg, 180.0);
    }

    #[test]
    fn test_within_budget_is_complete() {
        let rows = vec![row("a", -33.86, 151.2), row("b", -37.8, 144.9)];
        let state = RenderState::build(&snapshot(rows, None), &GridConfig::default());
        assert_eq!(state.status, RenderStatus::Complete);
        assert_eq!(state.shown, 2);
        assert!(state.overflow.is_empty());
    }

    #[test]
    fn test_map_view_rejects_unusable_cell_size() {
        use crate::client::fetcher::RepositoryPageFetcher;
        use crate::db::repositories::LocalRepository;

        let fetcher = Arc::new(RepositoryPageFetcher::new(Arc::new(LocalRepository::new())));
        let config = MapConfig {
            base_cell_deg: 0.0,
            render_budget: 1,
            ..MapConfig::default()
        };
        let err = MapView::new(fetcher, &config).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
