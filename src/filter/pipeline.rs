use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::debug;

use super::debounce::Debouncer;
use super::error::FilterError;
use super::types::{FilterSnapshot, RideFilter};
use crate::config::QueryConfig;
use crate::rides::types::RideStatus;

/// Turns rapid filter edits into a bounded-rate stream of [`FilterSnapshot`]s.
///
/// Any filter change resets pagination to the first page; a page change alone
/// keeps the rest of the filter.
pub struct QueryPipeline {
    draft: Mutex<RideFilter>,
    generation: AtomicU64,
    max_limit: u32,
    debouncer: Debouncer<FilterSnapshot>,
}

impl QueryPipeline {
    /// Create the pipeline and publish the initial snapshot without delay
    pub fn new(initial: RideFilter, config: &QueryConfig) -> Result<Self, FilterError> {
        let normalized = initial.normalized(config.max_page_size)?;
        let pipeline = Self {
            draft: Mutex::new(initial),
            generation: AtomicU64::new(0),
            max_limit: config.max_page_size,
            debouncer: Debouncer::new(config.debounce()),
        };
        pipeline.debouncer.emit_now(pipeline.next_snapshot(normalized));
        Ok(pipeline)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<FilterSnapshot>> {
        self.debouncer.subscribe()
    }

    /// Most recently emitted snapshot
    pub fn current(&self) -> Option<FilterSnapshot> {
        self.debouncer.latest()
    }

    /// Filter as currently edited, possibly not yet emitted
    pub fn draft(&self) -> RideFilter {
        self.draft.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_status(&self, status: Option<RideStatus>) -> Result<(), FilterError> {
        self.edit(|f| f.status = status)
    }

    pub fn set_department(&self, department: Option<String>) -> Result<(), FilterError> {
        self.edit(|f| f.department = department)
    }

    pub fn set_date_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), FilterError> {
        self.edit(|f| {
            f.start_date = start;
            f.end_date = end;
        })
    }

    /// Reset every filter field, keeping the page size
    pub fn clear(&self) -> Result<(), FilterError> {
        self.edit(|f| *f = RideFilter::with_limit(f.limit))
    }

    pub fn set_page(&self, page: u32) -> Result<(), FilterError> {
        let mut draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
        draft.page = page;
        self.submit(&draft)
    }

    fn edit(&self, change: impl FnOnce(&mut RideFilter)) -> Result<(), FilterError> {
        let mut draft = self.draft.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut draft);
        draft.page = 1;
        self.submit(&draft)
    }

    fn submit(&self, draft: &RideFilter) -> Result<(), FilterError> {
        match draft.normalized(self.max_limit) {
            Ok(filter) => {
                let snapshot = self.next_snapshot(filter);
                debug!(generation = snapshot.generation(), "Scheduling filter snapshot");
                self.debouncer.schedule(snapshot);
                Ok(())
            }
            Err(e) => {
                // An invalid intermediate state must not leak a stale pending emit
                self.debouncer.cancel();
                Err(e)
            }
        }
    }

    fn next_snapshot(&self, filter: RideFilter) -> FilterSnapshot {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        FilterSnapshot::new(generation, filter)
    }
}
