//! Viewport rectangles and the antimeridian-aware membership rule.
//!
//! A [`ViewportBounds`] always has `south <= north`. When `west > east` the box
//! crosses the antimeridian and longitude membership becomes disjunctive:
//! `lng >= west || lng <= east`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Error returned when a `"west,south,east,north"` string cannot be used as bounds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundsParseError {
    #[error("expected 4 comma-separated values, got {0}")]
    WrongArity(usize),
    #[error("component {index} is not a number: {value:?}")]
    NotANumber { index: usize, value: String },
    #[error("bounds contain a non-finite component")]
    NonFinite,
    #[error("south ({south}) is greater than north ({north})")]
    Inverted { south: f64, north: f64 },
}

/// Visible map area in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl ViewportBounds {
    /// Build normalised bounds from raw map-widget values.
    ///
    /// Longitudes outside `[-180, 180]` are wrapped back into range, a span of
    /// a full turn or more collapses to the whole world, and latitudes are
    /// clamped to the poles.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, BoundsParseError> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(BoundsParseError::NonFinite);
        }

        let south = south.clamp(MIN_LATITUDE, MAX_LATITUDE);
        let north = north.clamp(MIN_LATITUDE, MAX_LATITUDE);
        if south > north {
            return Err(BoundsParseError::Inverted { south, north });
        }

        let (west, east) = if west <= east && east - west >= 360.0 {
            (MIN_LONGITUDE, MAX_LONGITUDE)
        } else {
            (wrap_longitude(west), wrap_longitude(east))
        };

        Ok(Self {
            west,
            south,
            east,
            north,
        })
    }

    /// The whole globe.
    pub fn world() -> Self {
        Self {
            west: MIN_LONGITUDE,
            south: MIN_LATITUDE,
            east: MAX_LONGITUDE,
            north: MAX_LATITUDE,
        }
    }

    /// Parse a query-string value, ignoring it wholesale when it is unusable.
    ///
    /// Invalid bounds are never partially applied: any bad component yields `None`.
    pub fn from_query(raw: &str) -> Option<Self> {
        match raw.parse::<Self>() {
            Ok(bounds) => Some(bounds),
            Err(e) => {
                log::debug!("Ignoring bounds {:?}: {}", raw, e);
                None
            }
        }
    }

    /// True when the box crosses the antimeridian.
    pub fn wraps_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Membership test shared by the query builder and the client-side filter.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if !latitude.is_finite() || !longitude.is_finite() {
            return false;
        }
        if latitude < self.south || latitude > self.north {
            return false;
        }
        if self.wraps_antimeridian() {
            longitude >= self.west || longitude <= self.east
        } else {
            longitude >= self.west && longitude <= self.east
        }
    }
}

impl FromStr for ViewportBounds {
    type Err = BoundsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BoundsParseError::WrongArity(parts.len()));
        }

        let mut values = [0.0_f64; 4];
        for (index, part) in parts.iter().enumerate() {
            values[index] = part
                .parse::<f64>()
                .map_err(|_| BoundsParseError::NotANumber {
                    index,
                    value: part.to_string(),
                })?;
        }

        let [west, south, east, north] = values;
        Self::new(west, south, east, north)
    }
}

impl fmt::Display for ViewportBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    if (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude) {
        longitude
    } else {
        (longitude + 180.0).rem_euclid(360.0) - 180.0
    }
}
