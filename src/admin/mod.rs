//! Admin-only endpoints: analytics, activity feed and user management.
//!
//! Ride approval lives with the other ride mutations in [`crate::rides`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::gateway::{json_body, Gateway};
use crate::rides::types::Pagination;
use crate::types::{Registration, Role, UserProfile};

pub const DEFAULT_ACTIVITY_LIMIT: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSummary {
    pub total_rides: u64,
    pub pending_rides: u64,
    pub approved_rides: u64,
    pub completed_rides: u64,
    pub rejected_rides: u64,
    pub cancelled_rides: u64,
    pub total_users: u64,
}

impl AnalyticsSummary {
    /// Approved share of all rides, as a whole percentage
    pub fn approval_rate(&self) -> u64 {
        percent(self.approved_rides, self.total_rides)
    }

    pub fn completion_rate(&self) -> u64 {
        percent(self.completed_rides, self.total_rides)
    }
}

fn percent(part: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u64
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStat {
    #[serde(rename = "_id")]
    pub department: Option<String>,
    #[serde(default)]
    pub total_rides: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonthlyStat {
    #[serde(rename = "_id")]
    pub period: MonthKey,
    #[serde(default)]
    pub count: u64,
}

impl MonthlyStat {
    /// `YYYY-MM`
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.period.year, self.period.month)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FareAnalytics {
    pub total_fare: Option<Decimal>,
    pub avg_fare: Option<Decimal>,
    pub max_fare: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analytics {
    pub summary: AnalyticsSummary,
    pub department_analytics: Vec<DepartmentStat>,
    pub monthly_analytics: Vec<MonthlyStat>,
    pub fare_analytics: Option<FareAnalytics>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Activity {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub icon: Option<String>,
    pub data: Option<Value>,
}

impl Activity {
    pub fn destination(&self) -> Option<&str> {
        self.data.as_ref()?.get("destination")?.as_str()
    }
}

#[derive(Debug, Deserialize)]
struct ActivityPayload {
    #[serde(default)]
    activities: Vec<Activity>,
}

/// Filter for the user directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub search: Option<String>,
    pub department: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl UserQuery {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        let text = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(search) = text(&self.search) {
            query.push(("search".to_string(), search));
        }
        if let Some(department) = text(&self.department) {
            query.push(("department".to_string(), department));
        }
        if let Some(active) = self.is_active {
            query.push(("isActive".to_string(), active.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserPage {
    #[serde(default)]
    pub users: Vec<UserProfile>,
    pub pagination: Option<Pagination>,
}

/// Account created by an admin on someone's behalf
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    #[serde(flatten)]
    pub registration: Registration,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    user: UserProfile,
}

#[derive(Clone)]
pub struct AdminApi {
    gateway: Gateway,
}

impl AdminApi {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn analytics(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Analytics, ApiError> {
        let mut query = Vec::new();
        if let Some(start) = start {
            query.push(("startDate".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = end {
            query.push(("endDate".to_string(), end.format("%Y-%m-%d").to_string()));
        }
        self.gateway.get("/admin/analytics", query).await
    }

    pub async fn recent_activity(&self, limit: u32) -> Result<Vec<Activity>, ApiError> {
        let query = vec![("limit".to_string(), limit.max(1).to_string())];
        let ActivityPayload { activities } = self.gateway.get("/admin/recent-activity", query).await?;
        Ok(activities)
    }

    pub async fn users(&self, filter: &UserQuery) -> Result<UserPage, ApiError> {
        self.gateway.get("/users", filter.to_query()).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<UserProfile, ApiError> {
        let UserPayload { user } = self.gateway.post("/users", Some(json_body(user)?)).await?;
        Ok(user)
    }

    pub async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<UserProfile, ApiError> {
        let UserPayload { user } = self
            .gateway
            .put(&user_path(id)?, Some(json_body(patch)?))
            .await?;
        Ok(user)
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.gateway.delete::<IgnoredAny>(&user_path(id)?, None).await?;
        Ok(())
    }
}

fn user_path(id: &str) -> Result<String, ApiError> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::validation(format!("Invalid user id '{}'", id)));
    }
    Ok(format!("/users/{}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_analytics_with_missing_sections() {
        let analytics: Analytics = serde_json::from_value(json!({
            "summary": { "totalRides": 8, "approvedRides": 3, "completedRides": 2, "totalUsers": 5 },
            "departmentAnalytics": [{ "_id": "Finance", "totalRides": 4 }, { "_id": null, "totalRides": 1 }],
            "monthlyAnalytics": [{ "_id": { "year": 2026, "month": 9 }, "count": 6 }]
        }))
        .unwrap();

        assert_eq!(analytics.summary.pending_rides, 0);
        assert_eq!(analytics.summary.approval_rate(), 38);
        assert_eq!(analytics.summary.completion_rate(), 25);
        assert_eq!(analytics.department_analytics[1].department, None);
        assert_eq!(analytics.monthly_analytics[0].label(), "2026-09");
        assert!(analytics.fare_analytics.is_none());
    }

    #[test]
    fn rates_are_zero_without_rides() {
        assert_eq!(AnalyticsSummary::default().approval_rate(), 0);
    }

    #[test]
    fn activity_exposes_destination() {
        let activity: Activity = serde_json::from_value(json!({
            "id": "a1",
            "type": "ride_booked",
            "description": "Asha booked a ride",
            "timestamp": "2026-10-18T10:00:00Z",
            "icon": "car",
            "data": { "destination": "Airport" }
        }))
        .unwrap();
        assert_eq!(activity.destination(), Some("Airport"));
        assert_eq!(activity.kind, "ride_booked");
    }

    #[test]
    fn user_query_skips_blank_values() {
        let query = UserQuery {
            search: Some("  ".to_string()),
            department: Some("Ops".to_string()),
            is_active: Some(false),
            page: Some(2),
            limit: None,
        };
        assert_eq!(
            query.to_query(),
            vec![
                ("department".to_string(), "Ops".to_string()),
                ("isActive".to_string(), "false".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn new_user_flattens_registration() {
        let user = NewUser {
            registration: Registration {
                first_name: "Ravi".to_string(),
                last_name: "K".to_string(),
                email: "ravi@corp.test".to_string(),
                password: "secret1".to_string(),
                ..Registration::default()
            },
            role: Role::Admin,
        };
        let body = serde_json::to_value(&user).unwrap();
        assert_eq!(body["firstName"], "Ravi");
        assert_eq!(body["role"], "admin");
        assert!(body.get("phone").is_none());
    }
}
