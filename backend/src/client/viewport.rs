//! Authoritative viewport membership.
//!
//! The server's bounding box is only a prefilter. Every accumulated row is
//! re-tested against the bounds of the current view before clustering, and
//! rows that cannot be drawn are dropped here.

use crate::api::FacilityRow;
use crate::models::ViewportBounds;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportFilter {
    bounds: Option<ViewportBounds>,
}

impl ViewportFilter {
    /// `None` keeps every renderable row.
    pub fn new(bounds: Option<ViewportBounds>) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> Option<ViewportBounds> {
        self.bounds
    }

    pub fn contains(&self, row: &FacilityRow) -> bool {
        if !row.is_renderable() {
            return false;
        }
        match &self.bounds {
            Some(bounds) => bounds.contains(row.latitude, row.longitude),
            None => true,
        }
    }

    /// Rows inside the viewport, in their original order.
    pub fn apply(&self, rows: &[FacilityRow]) -> Vec<FacilityRow> {
        let kept: Vec<FacilityRow> = rows.iter().filter(|r| self.contains(r)).cloned().collect();
        if kept.len() < rows.len() {
            log::debug!(
                "Viewport filter dropped {} of {} rows",
                rows.len() - kept.len(),
                rows.len()
            );
        }
        kept
    }
}
