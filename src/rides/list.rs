use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use super::api::RidesApi;
use super::types::{Pagination, Ride, RideStatus};
use crate::error::ApiError;
use crate::filter::FilterSnapshot;
use crate::gateway::Gateway;

/// Which listing endpoint backs a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideScope {
    /// The signed-in user's own rides
    Own,
    /// Every ride, for admins
    All,
}

impl RideScope {
    pub fn list_path(&self) -> &'static str {
        match self {
            RideScope::Own => "/rides",
            RideScope::All => "/admin/rides",
        }
    }
}

#[derive(Debug, Default)]
struct ListState {
    requested: Option<FilterSnapshot>,
    applied: Option<FilterSnapshot>,
    rides: Vec<Ride>,
    pagination: Option<Pagination>,
    last_error: Option<ApiError>,
}

/// Ride listing driven by filter snapshots. Results for a snapshot older than
/// the newest requested one are dropped.
#[derive(Clone)]
pub struct RideList {
    api: RidesApi,
    scope: RideScope,
    state: Arc<Mutex<ListState>>,
    loaded: Arc<watch::Sender<u64>>,
}

impl RideList {
    pub fn new(gateway: Gateway, scope: RideScope) -> Self {
        let (loaded, _) = watch::channel(0);
        Self {
            api: RidesApi::new(gateway),
            scope,
            state: Arc::new(Mutex::new(ListState::default())),
            loaded: Arc::new(loaded),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn scope(&self) -> RideScope {
        self.scope
    }

    /// Fetch the rides for `snapshot`. Returns whether the result was applied.
    pub async fn load(&self, snapshot: FilterSnapshot) -> Result<bool, ApiError> {
        let generation = snapshot.generation();
        {
            let mut state = self.lock();
            if is_stale(&state.requested, generation) {
                debug!(generation, "Skipping fetch for superseded snapshot");
                return Ok(false);
            }
            state.requested = Some(snapshot.clone());
        }

        let result = self.api.list(self.scope, &snapshot).await;

        let mut state = self.lock();
        if is_stale(&state.requested, generation) {
            debug!(generation, "Discarding results for superseded snapshot");
            return Ok(false);
        }

        match result {
            Ok(page) => {
                debug!(generation, count = page.rides.len(), "Ride list loaded");
                state.rides = page.rides;
                state.pagination = page.pagination;
                state.applied = Some(snapshot);
                state.last_error = None;
                drop(state);
                self.loaded.send_replace(generation);
                Ok(true)
            }
            Err(e) => {
                if !e.is_session_expired() {
                    state.last_error = Some(e.clone());
                }
                Err(e)
            }
        }
    }

    /// Refetch the newest requested snapshot
    pub async fn reload(&self) -> Result<bool, ApiError> {
        let requested = self.lock().requested.clone();
        match requested {
            Some(snapshot) => self.load(snapshot).await,
            None => Ok(false),
        }
    }

    /// Generation of each applied load, for re-rendering
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.loaded.subscribe()
    }

    pub fn rides(&self) -> Vec<Ride> {
        self.lock().rides.clone()
    }

    pub fn find(&self, id: &str) -> Option<Ride> {
        self.lock().rides.iter().find(|r| r.id == id).cloned()
    }

    pub fn status_of(&self, id: &str) -> Option<RideStatus> {
        self.lock().rides.iter().find(|r| r.id == id).map(|r| r.status)
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.lock().pagination.clone()
    }

    pub fn applied_snapshot(&self) -> Option<FilterSnapshot> {
        self.lock().applied.clone()
    }

    pub fn last_error(&self) -> Option<ApiError> {
        self.lock().last_error.clone()
    }

    /// Record a server-confirmed status change ahead of the next refresh
    pub(crate) fn confirm_status(&self, id: &str, status: RideStatus) {
        if let Some(ride) = self.lock().rides.iter_mut().find(|r| r.id == id) {
            ride.status = status;
        }
    }

    /// Record a server-confirmed removal ahead of the next refresh
    pub(crate) fn confirm_removed(&self, id: &str) {
        self.lock().rides.retain(|r| r.id != id);
    }

    /// Track a ride fetched outside a listing, such as a detail view
    pub fn upsert(&self, ride: Ride) {
        let mut state = self.lock();
        match state.rides.iter_mut().find(|r| r.id == ride.id) {
            Some(existing) => *existing = ride,
            None => state.rides.push(ride),
        }
    }
}

fn is_stale(requested: &Option<FilterSnapshot>, generation: u64) -> bool {
    requested
        .as_ref()
        .is_some_and(|newest| generation < newest.generation())
}
