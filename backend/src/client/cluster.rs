//! Grid clustering.
//!
//! Facilities are binned into square cells of `cell_size` degrees keyed by
//! `(floor(lat / cell_size), floor(lng / cell_size))`. When the number of
//! occupied cells exceeds the render budget the cell size doubles and the
//! count is redone, up to the maximum cell size. Each pass is a single hash
//! pass over the candidates; aggregates are built once, for the accepted size.
//!
//! Output depends only on coordinates, identities and the cell size: members
//! are ordered by identity and glyphs by cell, so the same candidate set always
//! produces the same glyphs regardless of arrival order.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::config::MapConfig;
use super::dedup::DedupKey;
use crate::api::FacilityRow;
use crate::models::PrimaryFuel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    pub base_cell_deg: f64,
    pub max_cell_deg: f64,
    /// Maximum number of glyphs.
    pub budget: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig::from(&MapConfig::default())
    }
}

impl From<&MapConfig> for GridConfig {
    fn from(config: &MapConfig) -> Self {
        Self {
            base_cell_deg: config.base_cell_deg,
            max_cell_deg: config.max_cell_deg,
            budget: config.render_budget,
        }
    }
}

/// Cell size that puts every coordinate into at most four cells.
const WHOLE_GLOBE_CELL_DEG: f64 = 360.0;

/// Grid cell index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub row: i64,
    pub col: i64,
}

impl CellKey {
    pub fn of(latitude: f64, longitude: f64, cell_size_deg: f64) -> Self {
        Self {
            row: (latitude / cell_size_deg).floor() as i64,
            col: (longitude / cell_size_deg).floor() as i64,
        }
    }

    fn for_row(row: &FacilityRow, cell_size_deg: f64) -> Self {
        Self::of(row.latitude, row.longitude, cell_size_deg)
    }
}

/// A facility drawn on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub cell: CellKey,
    pub facility: FacilityRow,
    pub radius: u32,
}

impl Marker {
    pub fn color(&self) -> &'static str {
        self.facility.primary_fuel.color()
    }
}

/// Several facilities sharing a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub cell: CellKey,
    /// Mean member latitude.
    pub latitude: f64,
    /// Mean member longitude.
    pub longitude: f64,
    pub members: Vec<FacilityRow>,
    pub total_capacity_mw: i64,
    pub fuels: BTreeSet<PrimaryFuel>,
    pub radius: u32,
}

impl Cluster {
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Glyph {
    Marker(Marker),
    Cluster(Cluster),
}

impl Glyph {
    pub fn cell(&self) -> CellKey {
        match self {
            Glyph::Marker(m) => m.cell,
            Glyph::Cluster(c) => c.cell,
        }
    }

    pub fn member_count(&self) -> usize {
        match self {
            Glyph::Marker(_) => 1,
            Glyph::Cluster(c) => c.count(),
        }
    }

    pub fn total_capacity_mw(&self) -> i64 {
        match self {
            Glyph::Marker(m) => m.facility.capacity_mw,
            Glyph::Cluster(c) => c.total_capacity_mw,
        }
    }

    pub fn members(&self) -> &[FacilityRow] {
        match self {
            Glyph::Marker(m) => std::slice::from_ref(&m.facility),
            Glyph::Cluster(c) => &c.members,
        }
    }

    pub fn radius(&self) -> u32 {
        match self {
            Glyph::Marker(m) => m.radius,
            Glyph::Cluster(c) => c.radius,
        }
    }
}

/// Result of one clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Accepted cell size in degrees.
    pub cell_size_deg: f64,
    /// Glyphs in cell order.
    pub glyphs: Vec<Glyph>,
    /// Binning passes needed to settle on `cell_size_deg`.
    pub passes: u32,
    /// Number of facilities clustered.
    pub candidates: usize,
    /// False when even the coarsest grid exceeds the budget.
    pub within_budget: bool,
}

/// Marker radius in pixels by capacity.
pub fn marker_radius(capacity_mw: i64) -> u32 {
    match capacity_mw {
        c if c < 100 => 3,
        c if c < 500 => 4,
        c if c < 1000 => 5,
        c if c < 2000 => 6,
        _ => 7,
    }
}

/// Cluster radius in pixels, capped so large clusters stay legible.
pub fn cluster_radius(count: usize) -> u32 {
    let scaled = u32::try_from(count.saturating_mul(2)).unwrap_or(u32::MAX);
    scaled.clamp(8, 20)
}

fn occupied_cells(candidates: &[FacilityRow], cell_size_deg: f64) -> usize {
    candidates
        .iter()
        .map(|row| CellKey::for_row(row, cell_size_deg))
        .collect::<HashSet<_>>()
        .len()
}

/// Smallest cell size from the doubling sequence that fits the budget, or
/// the maximum cell size when none does. Returns the size and pass count.
///
/// A non-positive or non-finite base size cannot be doubled towards the
/// maximum, so the maximum is used directly. A non-finite maximum falls back
/// to a single whole-globe cell.
pub fn choose_cell_size(candidates: &[FacilityRow], config: &GridConfig) -> (f64, u32) {
    let max_cell = if config.max_cell_deg.is_finite() && config.max_cell_deg > 0.0 {
        config.max_cell_deg
    } else {
        WHOLE_GLOBE_CELL_DEG
    };
    let mut cell_size = config.base_cell_deg;
    if !(cell_size.is_finite() && cell_size > 0.0) {
        log::warn!(
            "Unusable base cell size {}; clustering at {}°",
            config.base_cell_deg,
            max_cell
        );
        cell_size = max_cell;
    }

    let mut passes = 1;
    loop {
        let cells = occupied_cells(candidates, cell_size);
        if cells <= config.budget || cell_size >= max_cell {
            return (cell_size, passes);
        }
        cell_size = (cell_size * 2.0).min(max_cell);
        passes += 1;
    }
}

fn build_glyph(cell: CellKey, mut members: Vec<FacilityRow>) -> Glyph {
    if members.len() == 1 {
        let facility = members.remove(0);
        return Glyph::Marker(Marker {
            cell,
            radius: marker_radius(facility.capacity_mw),
            facility,
        });
    }

    members.sort_by_cached_key(DedupKey::of);

    let count = members.len() as f64;
    let (lat_sum, lng_sum) = members
        .iter()
        .fold((0.0, 0.0), |(lat, lng), m| (lat + m.latitude, lng + m.longitude));
    let total_capacity_mw = members.iter().map(|m| m.capacity_mw).sum();
    let fuels = members.iter().map(|m| m.primary_fuel).collect();

    Glyph::Cluster(Cluster {
        cell,
        latitude: lat_sum / count,
        longitude: lng_sum / count,
        radius: cluster_radius(members.len()),
        members,
        total_capacity_mw,
        fuels,
    })
}

/// Cluster renderable candidates into at most `config.budget` glyphs when the
/// maximum cell size allows it.
pub fn cluster(candidates: Vec<FacilityRow>, config: &GridConfig) -> Clustering {
    let candidate_count = candidates.len();
    let (cell_size_deg, passes) = choose_cell_size(&candidates, config);

    let mut cells: HashMap<CellKey, Vec<FacilityRow>> = HashMap::new();
    for row in candidates {
        cells
            .entry(CellKey::for_row(&row, cell_size_deg))
            .or_default()
            .push(row);
    }

    let mut binned: Vec<(CellKey, Vec<FacilityRow>)> = cells.into_iter().collect();
    binned.sort_by_key(|(cell, _)| *cell);

    let glyphs: Vec<Glyph> = binned
        .into_iter()
        .map(|(cell, members)| build_glyph(cell, members))
        .collect();

    let within_budget = glyphs.len() <= config.budget;
    if !within_budget {
        log::warn!(
            "{} glyphs exceed render budget {} at maximum cell size {}°",
            glyphs.len(),
            config.budget,
            cell_size_deg
        );
    }
    log::debug!(
        "Clustered {} facilities into {} glyphs (cell {}°, {} passes)",
        candidate_count,
        glyphs.len(),
        cell_size_deg,
        passes
    );

    Clustering {
        cell_size_deg,
        glyphs,
        passes,
        candidates: candidate_count,
        within_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, lat: f64, lng: f64, capacity: i64, fuel: PrimaryFuel) -> FacilityRow {
        FacilityRow {
            id: Some(id.into()),
            name: id.into(),
            country_code: "ESP".into(),
            country_name: "Spain".into(),
            capacity_mw: capacity,
            latitude: lat,
            longitude: lng,
            primary_fuel: fuel,
            commissioning_year: None,
            owner: None,
        }
    }

    fn config(budget: usize) -> GridConfig {
        GridConfig {
            budget,
            ..GridConfig::default()
        }
    }

    #[test]
    fn test_marker_radius_thresholds() {
        assert_eq!(marker_radius(99), 3);
        assert_eq!(marker_radius(100), 4);
        assert_eq!(marker_radius(999), 5);
        assert_eq!(marker_radius(1999), 6);
        assert_eq!(marker_radius(22_500), 7);
    }

    #[test]
    fn test_cluster_radius_is_capped() {
        assert_eq!(cluster_radius(2), 8);
        assert_eq!(cluster_radius(7), 14);
        assert_eq!(cluster_radius(5000), 20);
    }

    #[test]
    fn test_cell_key_floors_negative_coordinates() {
        assert_eq!(CellKey::of(-0.1, -0.1, 0.3), CellKey { row: -1, col: -1 });
        assert_eq!(CellKey::of(0.1, 0.35, 0.3), CellKey { row: 0, col: 1 });
    }

    #[test]
    fn test_sparse_points_stay_markers() {
        let rows = vec![
            row("a", 40.0, -3.0, 50, PrimaryFuel::Solar),
            row("b", 41.0, 2.0, 800, PrimaryFuel::Gas),
        ];
        let result = cluster(rows, &config(10));
        assert_eq!(result.passes, 1);
        assert_eq!(result.cell_size_deg, 0.3);
        assert!(result.glyphs.iter().all(|g| matches!(g, Glyph::Marker(_))));
        assert_eq!(result.glyphs[1].radius(), 5);
    }

    #[test]
    fn test_shared_cell_aggregates() {
        let rows = vec![
            row("b", 40.05, -3.1, 100, PrimaryFuel::Wind),
            row("a", 40.1, -3.2, 300, PrimaryFuel::Solar),
            row("c", 40.15, -3.15, 50, PrimaryFuel::Wind),
        ];
        let result = cluster(rows, &config(10));
        assert_eq!(result.glyphs.len(), 1);
        let Glyph::Cluster(c) = &result.glyphs[0] else {
            panic!("expected a cluster");
        };
        assert_eq!(c.count(), 3);
        assert_eq!(c.total_capacity_mw, 450);
        assert_eq!(
            c.fuels.iter().copied().collect::<Vec<_>>(),
            vec![PrimaryFuel::Wind, PrimaryFuel::Solar]
        );
        assert!((c.latitude - 40.1).abs() < 1e-9);
        assert!((c.longitude + 3.15).abs() < 1e-9);
        let ids: Vec<_> = c.members.iter().filter_map(|m| m.id.as_deref()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cell_size_doubles_until_within_budget() {
        let rows: Vec<_> = (0..8)
            .map(|i| row(&format!("p{i}"), 0.05, 0.05 + i as f64 * 0.5, 10, PrimaryFuel::Gas))
            .collect();
        let result = cluster(rows, &config(2));
        assert!(result.within_budget);
        assert!(result.glyphs.len() <= 2);
        assert!(result.passes > 1);
        assert!(result.cell_size_deg > 0.3);
    }

    #[test]
    fn test_budget_unreachable_at_max_cell() {
        let rows = vec![
            row("ne", 45.0, 90.0, 10, PrimaryFuel::Coal),
            row("sw", -45.0, -90.0, 10, PrimaryFuel::Coal),
        ];
        let result = cluster(rows, &config(1));
        assert_eq!(result.cell_size_deg, 180.0);
        assert!(!result.within_budget);
        assert_eq!(result.glyphs.len(), 2);
    }

    #[test]
    fn test_output_independent_of_arrival_order() {
        let rows: Vec<_> = (0..50)
            .map(|i| {
                row(
                    &format!("f{i:02}"),
                    10.0 + (i % 7) as f64 * 0.01,
                    20.0 + (i % 5) as f64 * 0.01,
                    i + 1,
                    PrimaryFuel::Hydro,
                )
            })
            .collect();
        let mut reversed = rows.clone();
        reversed.reverse();
        assert_eq!(cluster(rows, &config(5)), cluster(reversed, &config(5)));
    }

    #[test]
    fn test_zero_base_cell_terminates_at_max_cell() {
        let rows = vec![
            row("n", 10.0, 10.0, 10, PrimaryFuel::Wind),
            row("s", -10.0, -10.0, 10, PrimaryFuel::Wind),
        ];
        let grid = GridConfig {
            base_cell_deg: 0.0,
            max_cell_deg: 180.0,
            budget: 1,
        };
        let result = cluster(rows, &grid);
        assert_eq!(result.cell_size_deg, 180.0);
        assert_eq!(result.passes, 1);
        assert_eq!(result.candidates, 2);
    }

    #[test]
    fn test_non_finite_cell_sizes_terminate() {
        let rows = vec![row("a", 1.0, 1.0, 10, PrimaryFuel::Gas)];
        let grid = GridConfig {
            base_cell_deg: f64::NAN,
            max_cell_deg: f64::INFINITY,
            budget: 1,
        };
        let result = cluster(rows, &grid);
        assert_eq!(result.cell_size_deg, 360.0);
        assert!(result.within_budget);
    }
}
