//! Merges the pages of one sweep into a unique set of rows.
//!
//! Adjacent bounding-box pages overlap at their edges, so the same facility
//! can arrive more than once. Rows are keyed by id when they carry a usable
//! one, and by their canonical JSON encoding otherwise.

use std::collections::HashMap;

use crate::api::FacilityRow;

/// Identity of a row for deduplication and for stable ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DedupKey {
    Id(String),
    Value(String),
}

impl DedupKey {
    pub fn of(row: &FacilityRow) -> Self {
        match row.stable_id() {
            Some(id) => DedupKey::Id(id.to_string()),
            None => DedupKey::Value(canonical_encoding(row)),
        }
    }
}

fn canonical_encoding(row: &FacilityRow) -> String {
    // Field order is fixed by the struct definition, so the encoding is canonical.
    serde_json::to_string(row).unwrap_or_else(|_| format!("{:?}", row))
}

/// Insertion-ordered set of rows keyed by [`DedupKey`].
///
/// Re-inserting a known key overwrites the row in its original slot, so the
/// server's ordering is preserved across pages.
#[derive(Debug, Clone, Default)]
pub struct DedupAccumulator {
    index: HashMap<DedupKey, usize>,
    rows: Vec<FacilityRow>,
    duplicates: usize,
}

impl DedupAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row; returns `true` when its key was not seen before.
    pub fn insert(&mut self, row: FacilityRow) -> bool {
        let key = DedupKey::of(&row);
        match self.index.get(&key) {
            Some(&slot) => {
                self.rows[slot] = row;
                self.duplicates += 1;
                false
            }
            None => {
                self.index.insert(key, self.rows.len());
                self.rows.push(row);
                true
            }
        }
    }

    /// Merge a page; returns the number of new rows.
    pub fn extend<I: IntoIterator<Item = FacilityRow>>(&mut self, rows: I) -> usize {
        let mut added = 0;
        for row in rows {
            if self.insert(row) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// How many inserted rows replaced an existing entry.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn rows(&self) -> &[FacilityRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<FacilityRow> {
        self.rows
    }
}
