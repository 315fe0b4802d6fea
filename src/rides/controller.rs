use std::sync::Arc;

use tracing::{debug, info, warn};

use super::api::{validate_id, RidesApi, DEFAULT_CANCEL_REASON};
use super::in_flight::InFlightSet;
use super::list::RideList;
use super::types::RideStatus;
use crate::error::ApiError;
use crate::gateway::{Gateway, RequestOptions};
use crate::notify::{Notification, Notifier};

pub const CANCEL_PROMPT: &str = "Are you sure you want to cancel this ride?";
pub const DELETE_PROMPT: &str = "Are you sure you want to permanently delete this ride? This action cannot be undone.";

const NOT_CANCELLABLE: &str = "This ride cannot be cancelled";
const ONLY_CANCELLED_DELETABLE: &str = "Only cancelled rides can be deleted";
const ONLY_PENDING_DECIDABLE: &str = "Only pending rides can be approved or rejected";

/// Asks the user to confirm a destructive action
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Accepts every prompt
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

impl Confirm for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Server accepted the mutation and the list was refreshed
    Completed,
    /// A mutation for this ride is already in flight; nothing was sent
    Busy,
    /// The user declined the confirmation; nothing was sent
    Declined,
    /// The session expired mid-request; the sign-out already happened
    Aborted,
}

/// Serializes cancel, delete and approval actions per ride.
///
/// At most one mutation per ride id is on the wire at a time. Every failure
/// except an expired session reaches the user exactly once.
#[derive(Clone)]
pub struct RideController {
    api: RidesApi,
    list: RideList,
    in_flight: InFlightSet,
    notifier: Arc<dyn Notifier>,
    confirm: Arc<dyn Confirm>,
}

impl RideController {
    pub fn new(gateway: Gateway, list: RideList, notifier: Arc<dyn Notifier>, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            api: RidesApi::new(gateway),
            list,
            in_flight: InFlightSet::new(),
            notifier,
            confirm,
        }
    }

    pub fn list(&self) -> &RideList {
        &self.list
    }

    /// Whether a mutation for `id` is in flight; drives disabled buttons
    pub fn is_busy(&self, id: &str) -> bool {
        self.in_flight.contains(id.trim())
    }

    pub fn busy_ids(&self) -> Vec<String> {
        self.in_flight.ids()
    }

    pub async fn cancel(&self, id: &str) -> Result<MutationOutcome, ApiError> {
        self.cancel_with_reason(id, DEFAULT_CANCEL_REASON).await
    }

    pub async fn cancel_with_reason(&self, id: &str, reason: &str) -> Result<MutationOutcome, ApiError> {
        let id = self.ride_id(id)?;
        if self.list.status_of(id).is_some_and(|s| !s.can_cancel()) {
            return Err(self.refuse(NOT_CANCELLABLE));
        }
        if self.in_flight.contains(id) {
            debug!(ride = id, "Cancel ignored, ride busy");
            return Ok(MutationOutcome::Busy);
        }
        if !self.confirm.confirm(CANCEL_PROMPT) {
            return Ok(MutationOutcome::Declined);
        }
        let Some(_guard) = self.in_flight.try_acquire(id) else {
            return Ok(MutationOutcome::Busy);
        };

        let result = self.api.cancel(id, reason).await;
        self.finish(id, result, "Ride cancelled successfully", |list| {
            list.confirm_status(id, RideStatus::Cancelled)
        })
        .await
    }

    /// Remove a cancelled ride for good
    pub async fn delete_permanently(&self, id: &str) -> Result<MutationOutcome, ApiError> {
        let id = self.ride_id(id)?;
        if self.list.status_of(id).is_some_and(|s| !s.can_delete()) {
            return Err(self.refuse(ONLY_CANCELLED_DELETABLE));
        }
        if self.in_flight.contains(id) {
            debug!(ride = id, "Delete ignored, ride busy");
            return Ok(MutationOutcome::Busy);
        }
        if !self.confirm.confirm(DELETE_PROMPT) {
            return Ok(MutationOutcome::Declined);
        }
        let Some(_guard) = self.in_flight.try_acquire(id) else {
            return Ok(MutationOutcome::Busy);
        };

        // Silent so the 400 can be reworded before it reaches the user
        let result = self
            .api
            .delete_permanently(id, RequestOptions::silent())
            .await
            .map_err(|e| match e.status_code() {
                Some(400) => ApiError::validation(ONLY_CANCELLED_DELETABLE).with_status(400),
                _ => e,
            });
        if let Err(e) = &result {
            if !e.is_session_expired() {
                self.notifier.notify(Notification::error(e.message()));
            }
        }

        self.finish(id, result, "Ride deleted permanently", |list| list.confirm_removed(id))
            .await
    }

    pub async fn approve(&self, id: &str, comments: Option<&str>) -> Result<MutationOutcome, ApiError> {
        let id = self.ride_id(id)?;
        if self.list.status_of(id).is_some_and(|s| !s.can_transition_to(RideStatus::Approved)) {
            return Err(self.refuse(ONLY_PENDING_DECIDABLE));
        }
        let Some(_guard) = self.in_flight.try_acquire(id) else {
            return Ok(MutationOutcome::Busy);
        };

        let result = self.api.approve(id, comments).await;
        self.finish(id, result, "Ride approved", |list| list.confirm_status(id, RideStatus::Approved))
            .await
    }

    pub async fn reject(
        &self,
        id: &str,
        reason: Option<&str>,
        comments: Option<&str>,
    ) -> Result<MutationOutcome, ApiError> {
        let id = self.ride_id(id)?;
        if self.list.status_of(id).is_some_and(|s| !s.can_transition_to(RideStatus::Rejected)) {
            return Err(self.refuse(ONLY_PENDING_DECIDABLE));
        }
        let Some(_guard) = self.in_flight.try_acquire(id) else {
            return Ok(MutationOutcome::Busy);
        };

        let result = self.api.reject(id, reason, comments).await;
        self.finish(id, result, "Ride rejected", |list| list.confirm_status(id, RideStatus::Rejected))
            .await
    }

    /// Normalized id; the in-flight key and the request path must agree
    fn ride_id<'a>(&self, id: &'a str) -> Result<&'a str, ApiError> {
        validate_id(id).map_err(|e| {
            self.notifier.notify(Notification::error(e.message()));
            e
        })
    }

    /// Local refusal: reported once, nothing sent
    fn refuse(&self, message: &str) -> ApiError {
        self.notifier.notify(Notification::error(message));
        ApiError::validation(message)
    }

    async fn finish(
        &self,
        id: &str,
        result: Result<(), ApiError>,
        success: &str,
        apply: impl FnOnce(&RideList),
    ) -> Result<MutationOutcome, ApiError> {
        match result {
            Ok(()) => {
                info!(ride = id, "{}", success);
                apply(&self.list);
                if let Err(e) = self.list.reload().await {
                    debug!(ride = id, "Refresh after mutation failed: {}", e);
                }
                self.notifier.notify(Notification::success(success));
                Ok(MutationOutcome::Completed)
            }
            Err(e) if e.is_session_expired() => {
                debug!(ride = id, "Mutation aborted by session expiry");
                Ok(MutationOutcome::Aborted)
            }
            Err(e) => {
                warn!(ride = id, "Mutation failed: {}", e);
                Err(e)
            }
        }
    }
}
