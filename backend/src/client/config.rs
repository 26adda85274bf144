//! Client pipeline configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::ConfigError;
use crate::models::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Tuning for sweeps, clustering and the HTTP fetcher.
///
/// Every field has a default, so a TOML file only needs the values it
/// overrides:
///
/// ```
/// use gppd_map::client::MapConfig;
///
/// let config = MapConfig::from_toml_str("render_budget = 500").unwrap();
/// assert_eq!(config.render_budget, 500);
/// assert_eq!(config.page_limit, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Rows requested per page.
    pub page_limit: u32,
    /// Upper bound on pages per sweep.
    pub max_pages: u32,
    /// Maximum glyphs drawn in one render pass.
    pub render_budget: usize,
    /// Starting grid cell size in degrees.
    pub base_cell_deg: f64,
    /// Coarsest grid cell size in degrees.
    pub max_cell_deg: f64,
    /// Per-request timeout for the HTTP fetcher.
    pub request_timeout_secs: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            max_pages: 64,
            render_budget: 3000,
            base_cell_deg: 0.3,
            max_cell_deg: 180.0,
            request_timeout_secs: 30,
        }
    }
}

impl MapConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 || self.page_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "page_limit must be within 1..={}, got {}",
                MAX_PAGE_LIMIT, self.page_limit
            )));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Invalid("max_pages must be positive".into()));
        }
        if self.render_budget == 0 {
            return Err(ConfigError::Invalid("render_budget must be positive".into()));
        }
        if !(self.base_cell_deg.is_finite() && self.base_cell_deg > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "base_cell_deg must be a positive number, got {}",
                self.base_cell_deg
            )));
        }
        if !(self.max_cell_deg.is_finite() && self.max_cell_deg >= self.base_cell_deg) {
            return Err(ConfigError::Invalid(format!(
                "max_cell_deg ({}) must be at least base_cell_deg ({})",
                self.max_cell_deg, self.base_cell_deg
            )));
        }
        Ok(())
    }
}
