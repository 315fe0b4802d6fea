use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ride lifecycle.
///
/// pending -> {approved, rejected, cancelled}; approved -> {in_progress, completed, cancelled};
/// in_progress -> {completed, cancelled}. Rejected, cancelled and completed accept no
/// user-initiated transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Approved,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub const ALL: [RideStatus; 6] = [
        RideStatus::Pending,
        RideStatus::Approved,
        RideStatus::Rejected,
        RideStatus::InProgress,
        RideStatus::Completed,
        RideStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Approved => "approved",
            RideStatus::Rejected => "rejected",
            RideStatus::InProgress => "in_progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    /// Admin decisions and server-driven progress; cancellation has its own gate
    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, next),
            (Pending, Approved | Rejected | Cancelled)
                | (Approved, InProgress | Completed | Cancelled)
                | (InProgress, Completed | Cancelled)
        )
    }

    /// Client-side gate for cancellation; the server has the final word
    pub fn can_cancel(&self) -> bool {
        !matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    /// Permanent removal is only allowed once cancelled
    pub fn can_delete(&self) -> bool {
        *self == RideStatus::Cancelled
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        RideStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("Unknown ride status: {}", s))
    }
}

/// Ride owner as sent by the backend: a bare id, or the populated user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RideOwner {
    Id(String),
    Profile(OwnerSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub department: Option<String>,
}

impl RideOwner {
    pub fn id(&self) -> &str {
        match self {
            RideOwner::Id(id) => id,
            RideOwner::Profile(owner) => &owner.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub owner: Option<RideOwner>,
    pub pickup: String,
    pub drop: String,
    pub schedule_time: DateTime<Utc>,
    pub status: RideStatus,
    pub estimated_fare: Option<Decimal>,
    pub actual_fare: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Ride {
    pub fn owner_id(&self) -> Option<&str> {
        self.owner.as_ref().map(RideOwner::id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

/// One page of a ride listing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RidePage {
    #[serde(default)]
    pub rides: Vec<Ride>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRide {
    pub pickup: String,
    pub drop: String,
    pub schedule_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fare: Option<Decimal>,
}

/// Edit of a pending ride
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_time: Option<DateTime<Utc>>,
}
