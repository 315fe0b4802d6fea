use std::sync::Arc;
use std::time::Duration;

use futures::future::{abortable, AbortHandle};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::controller::{Confirm, RideController};
use super::list::{RideList, RideScope};
use super::types::Ride;
use crate::config::QueryConfig;
use crate::filter::{FilterError, QueryPipeline, RideFilter};
use crate::gateway::Gateway;
use crate::notify::Notifier;

/// A mounted ride list: filter pipeline, listing and mutation controller.
///
/// Every emitted filter snapshot triggers a fetch. Background tasks stop when
/// the view is dropped.
pub struct RideListView {
    pipeline: Arc<QueryPipeline>,
    list: RideList,
    controller: RideController,
    tasks: Vec<AbortHandle>,
}

impl RideListView {
    pub fn open(
        gateway: Gateway,
        scope: RideScope,
        initial: RideFilter,
        config: &QueryConfig,
        notifier: Arc<dyn Notifier>,
        confirm: Arc<dyn Confirm>,
    ) -> Result<Self, FilterError> {
        let pipeline = Arc::new(QueryPipeline::new(initial, config)?);
        let list = RideList::new(gateway.clone(), scope);
        let controller = RideController::new(gateway, list.clone(), notifier, confirm);

        let mut snapshots = pipeline.subscribe();
        let driver_list = list.clone();
        let (driver, handle) = abortable(async move {
            let mut pending = snapshots.borrow_and_update().clone();
            loop {
                if let Some(snapshot) = pending.take() {
                    // Fetches overlap; the list drops superseded results
                    let list = driver_list.clone();
                    tokio::spawn(async move {
                        let generation = snapshot.generation();
                        if let Err(e) = list.load(snapshot).await {
                            debug!(generation, "Ride list fetch failed: {}", e);
                        }
                    });
                }
                if snapshots.changed().await.is_err() {
                    break;
                }
                pending = snapshots.borrow_and_update().clone();
            }
        });
        tokio::spawn(driver);

        Ok(Self {
            pipeline,
            list,
            controller,
            tasks: vec![handle],
        })
    }

    /// Refetch the current snapshot every `interval`. Polling never touches
    /// the in-flight set.
    pub fn start_polling(&mut self, interval: Duration) {
        let pipeline = self.pipeline.clone();
        let list = self.list.clone();
        let (poller, handle) = abortable(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Some(snapshot) = pipeline.current() {
                    if let Err(e) = list.load(snapshot).await {
                        debug!("Background refresh failed: {}", e);
                    }
                }
            }
        });
        tokio::spawn(poller);
        self.tasks.push(handle);
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }

    pub fn list(&self) -> &RideList {
        &self.list
    }

    pub fn controller(&self) -> &RideController {
        &self.controller
    }

    pub fn rides(&self) -> Vec<Ride> {
        self.list.rides()
    }

    /// Fires with the snapshot generation whenever new results are applied
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.list.subscribe()
    }
}

impl Drop for RideListView {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
