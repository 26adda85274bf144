//! Pagination sweeps with generation tokens.
//!
//! A sweep fetches pages for one filter from offset 0 until the accumulated
//! rows reach the declared total, a page comes back short, or `max_pages` is
//! hit. Every sweep takes a fresh generation from a monotonically increasing
//! counter. Pages are checked against the latest generation as they arrive,
//! and results are committed under a single lock only if the sweep is still
//! the latest one, so a slow older sweep can never overwrite a newer view.
//!
//! Superseded sweeps are not cancelled. Their in-flight request completes and
//! the result is dropped.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::config::MapConfig;
use super::dedup::DedupAccumulator;
use super::error::SweepError;
use super::fetcher::PageFetcher;
use crate::api::FacilityRow;
use crate::models::{FacilityFilter, QueryFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    pub page_limit: u32,
    pub max_pages: u32,
}

impl From<&MapConfig> for SweepConfig {
    fn from(config: &MapConfig) -> Self {
        Self {
            page_limit: config.page_limit.max(1),
            max_pages: config.max_pages.max(1),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig::from(&MapConfig::default())
    }
}

/// Rows committed by a completed sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSnapshot {
    pub generation: u64,
    pub filter: FacilityFilter,
    /// Unique rows in server order.
    pub rows: Vec<FacilityRow>,
    /// Total declared by the first page.
    pub declared_total: u64,
    pub pages: u32,
    /// Rows that arrived more than once across pages.
    pub duplicates: usize,
    /// The sweep stopped at `max_pages` before reaching `declared_total`.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    Committed(Arc<SweepSnapshot>),
    /// A newer sweep started before this one could commit.
    Superseded { generation: u64, latest: u64 },
    Failed(SweepError),
}

impl SweepOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SweepOutcome::Committed(_))
    }
}

#[derive(Debug)]
struct SweepProgress {
    generation: u64,
    filter: FacilityFilter,
    rows: DedupAccumulator,
    next_offset: u64,
    declared_total: Option<u64>,
    pages: u32,
}

impl SweepProgress {
    fn new(generation: u64, filter: FacilityFilter) -> Self {
        Self {
            generation,
            filter,
            rows: DedupAccumulator::new(),
            next_offset: 0,
            declared_total: None,
            pages: 0,
        }
    }
}

#[derive(Debug)]
struct FailedSweep {
    progress: SweepProgress,
    error: SweepError,
}

#[derive(Debug, Default)]
struct SweepState {
    committed: Option<Arc<SweepSnapshot>>,
    failed: Option<FailedSweep>,
}

/// Runs sweeps against a [`PageFetcher`] and owns the committed result.
pub struct SweepController<F: ?Sized> {
    fetcher: Arc<F>,
    config: SweepConfig,
    latest: AtomicU64,
    state: Mutex<SweepState>,
}

impl<F: PageFetcher + ?Sized> SweepController<F> {
    pub fn new(fetcher: Arc<F>, config: SweepConfig) -> Self {
        Self {
            fetcher,
            config,
            latest: AtomicU64::new(0),
            state: Mutex::new(SweepState::default()),
        }
    }

    pub fn config(&self) -> SweepConfig {
        self.config
    }

    /// Generation of the most recently started sweep (0 before the first).
    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest_generation() == generation
    }

    /// Last committed sweep, if any.
    pub fn committed(&self) -> Option<Arc<SweepSnapshot>> {
        self.state.lock().committed.clone()
    }

    /// Error of the pending failed sweep, if it is still retryable.
    pub fn last_error(&self) -> Option<SweepError> {
        let state = self.state.lock();
        state
            .failed
            .as_ref()
            .filter(|f| f.progress.generation == self.latest_generation())
            .map(|f| f.error.clone())
    }

    fn next_generation(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Start a new sweep for `filter`, superseding any sweep in flight.
    pub async fn sweep(&self, filter: FacilityFilter) -> SweepOutcome {
        let generation = self.next_generation();
        log::debug!("Starting sweep {} for {:?}", generation, filter);
        self.drive(SweepProgress::new(generation, filter)).await
    }

    /// Re-issue the request that failed most recently and resume its sweep.
    ///
    /// Returns `None` when there is nothing to retry, or when a newer sweep
    /// has started since the failure.
    pub async fn retry_failed(&self) -> Option<SweepOutcome> {
        let failed = self.take_retryable()?;
        log::info!(
            "Retrying sweep {} from offset {}",
            failed.progress.generation,
            failed.progress.next_offset
        );
        Some(self.drive(failed.progress).await)
    }

    fn take_retryable(&self) -> Option<FailedSweep> {
        let mut state = self.state.lock();
        let failed = state.failed.take()?;
        let latest = self.latest_generation();
        if failed.progress.generation != latest {
            log::debug!(
                "Dropping retry for sweep {}; sweep {} has started since",
                failed.progress.generation,
                latest
            );
            return None;
        }
        Some(failed)
    }

    fn superseded(&self, generation: u64) -> SweepOutcome {
        let latest = self.latest_generation();
        log::debug!("Sweep {} superseded by {}", generation, latest);
        SweepOutcome::Superseded { generation, latest }
    }

    async fn drive(&self, mut progress: SweepProgress) -> SweepOutcome {
        let limit = self.config.page_limit;
        let mut truncated = false;

        loop {
            if !self.is_current(progress.generation) {
                return self.superseded(progress.generation);
            }
            if progress.pages >= self.config.max_pages {
                log::warn!(
                    "Sweep {} stopped after {} pages ({} of {:?} rows)",
                    progress.generation,
                    progress.pages,
                    progress.rows.len(),
                    progress.declared_total
                );
                truncated = true;
                break;
            }

            let request = QueryFilter::new(progress.filter.clone(), limit, progress.next_offset);
            let result = self.fetcher.fetch_page(&request).await;

            // Discard on arrival once a newer sweep exists.
            if !self.is_current(progress.generation) {
                return self.superseded(progress.generation);
            }

            let page = match result {
                Ok(page) => page,
                Err(source) => {
                    let error = SweepError {
                        generation: progress.generation,
                        offset: progress.next_offset,
                        source,
                    };
                    return self.record_failure(progress, error);
                }
            };

            progress.pages += 1;
            let declared = *progress.declared_total.get_or_insert(page.total);
            if page.total != declared {
                log::warn!(
                    "Sweep {}: total drifted from {} to {} at offset {}",
                    progress.generation,
                    declared,
                    page.total,
                    progress.next_offset
                );
            }

            let received = page.rows.len();
            progress.rows.extend(page.rows);
            progress.next_offset += received as u64;

            if received < limit as usize || progress.next_offset >= declared {
                break;
            }
        }

        self.commit(progress, truncated)
    }

    fn record_failure(&self, progress: SweepProgress, error: SweepError) -> SweepOutcome {
        let mut state = self.state.lock();
        if !self.is_current(progress.generation) {
            return self.superseded(progress.generation);
        }
        log::warn!("{}", error);
        state.failed = Some(FailedSweep {
            progress,
            error: error.clone(),
        });
        SweepOutcome::Failed(error)
    }

    fn commit(&self, progress: SweepProgress, truncated: bool) -> SweepOutcome {
        let mut state = self.state.lock();
        if !self.is_current(progress.generation) {
            return self.superseded(progress.generation);
        }

        let snapshot = Arc::new(SweepSnapshot {
            generation: progress.generation,
            declared_total: progress.declared_total.unwrap_or(0),
            pages: progress.pages,
            duplicates: progress.rows.duplicates(),
            truncated,
            filter: progress.filter,
            rows: progress.rows.into_rows(),
        });
        log::debug!(
            "Committed sweep {}: {} rows over {} pages",
            snapshot.generation,
            snapshot.rows.len(),
            snapshot.pages
        );
        state.committed = Some(snapshot.clone());
        state.failed = None;
        SweepOutcome::Committed(snapshot)
    }
}
