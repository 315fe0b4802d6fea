use reqwest::Method;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::json;

use super::list::RideScope;
use super::types::{NewRide, Ride, RidePage, RideUpdate};
use crate::error::ApiError;
use crate::filter::FilterSnapshot;
use crate::gateway::{json_body, Gateway, RequestOptions};

pub const DEFAULT_CANCEL_REASON: &str = "Cancelled by user";

#[derive(Debug, Deserialize)]
struct RidePayload {
    ride: Ride,
}

/// Ride endpoints, for both the booking user and the approving admin
#[derive(Clone)]
pub struct RidesApi {
    gateway: Gateway,
}

impl RidesApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, scope: RideScope, snapshot: &FilterSnapshot) -> Result<RidePage, ApiError> {
        self.gateway.get(scope.list_path(), snapshot.to_query()).await
    }

    pub async fn get(&self, id: &str) -> Result<Ride, ApiError> {
        let RidePayload { ride } = self.gateway.get(&ride_path(id, "")?, Vec::new()).await?;
        Ok(ride)
    }

    pub async fn create(&self, ride: &NewRide) -> Result<Ride, ApiError> {
        let RidePayload { ride } = self.gateway.post("/rides", Some(json_body(ride)?)).await?;
        Ok(ride)
    }

    /// Edit a pending ride
    pub async fn update(&self, id: &str, update: &RideUpdate) -> Result<Ride, ApiError> {
        let RidePayload { ride } = self
            .gateway
            .put(&ride_path(id, "")?, Some(json_body(update)?))
            .await?;
        Ok(ride)
    }

    /// Soft cancel; the ride stays listed as cancelled
    pub async fn cancel(&self, id: &str, reason: &str) -> Result<(), ApiError> {
        self.gateway
            .delete::<IgnoredAny>(&ride_path(id, "")?, Some(json!({ "reason": reason })))
            .await?;
        Ok(())
    }

    pub async fn delete_permanently(&self, id: &str, opts: RequestOptions) -> Result<(), ApiError> {
        self.gateway
            .fetch::<IgnoredAny>(Method::DELETE, &ride_path(id, "/permanent")?, None, opts)
            .await?;
        Ok(())
    }

    pub async fn approve(&self, id: &str, comments: Option<&str>) -> Result<(), ApiError> {
        self.gateway
            .put::<IgnoredAny>(&admin_ride_path(id, "/approve")?, Some(json!({ "comments": comments })))
            .await?;
        Ok(())
    }

    pub async fn reject(&self, id: &str, reason: Option<&str>, comments: Option<&str>) -> Result<(), ApiError> {
        self.gateway
            .put::<IgnoredAny>(
                &admin_ride_path(id, "/reject")?,
                Some(json!({ "reason": reason, "comments": comments })),
            )
            .await?;
        Ok(())
    }
}

pub(crate) fn validate_id(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::validation(format!("Invalid ride id '{}'", id)));
    }
    Ok(id)
}

fn ride_path(id: &str, suffix: &str) -> Result<String, ApiError> {
    Ok(format!("/rides/{}{}", validate_id(id)?, suffix))
}

fn admin_ride_path(id: &str, suffix: &str) -> Result<String, ApiError> {
    Ok(format!("/admin/rides/{}{}", validate_id(id)?, suffix))
}
