use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::FilterError;
use crate::rides::types::RideStatus;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Raw, editable list filter as the user is typing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideFilter {
    pub status: Option<RideStatus>,
    pub department: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: u32,
    pub limit: u32,
}

impl Default for RideFilter {
    fn default() -> Self {
        Self {
            status: None,
            department: None,
            start_date: None,
            end_date: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl RideFilter {
    pub fn with_limit(limit: u32) -> Self {
        Self { limit, ..Self::default() }
    }

    /// Validate and normalize into a sendable filter
    pub fn normalized(&self, max_limit: u32) -> Result<RideFilter, FilterError> {
        if self.page == 0 {
            return Err(FilterError::InvalidPage(self.page));
        }
        if self.limit == 0 {
            return Err(FilterError::InvalidLimit("Limit must be positive".to_string()));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(FilterError::InvalidDateRange { start, end });
            }
        }

        let limit = if self.limit > max_limit {
            tracing::warn!("Limit {} exceeds max {}, capping to max", self.limit, max_limit);
            max_limit
        } else {
            self.limit
        };

        let department = self
            .department
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(RideFilter {
            department,
            limit,
            ..self.clone()
        })
    }
}

/// Immutable, fully resolved query. A newer snapshot replaces an older one;
/// `generation` orders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSnapshot {
    generation: u64,
    filter: RideFilter,
}

impl FilterSnapshot {
    pub(crate) fn new(generation: u64, filter: RideFilter) -> Self {
        Self { generation, filter }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn filter(&self) -> &RideFilter {
        &self.filter
    }

    pub fn page(&self) -> u32 {
        self.filter.page
    }

    /// Query string pairs; absent values are omitted
    pub fn to_query(&self) -> Vec<(String, String)> {
        let f = &self.filter;
        let mut query = Vec::new();

        if let Some(status) = f.status {
            query.push(("status".to_string(), status.as_str().to_string()));
        }
        if let Some(department) = &f.department {
            query.push(("department".to_string(), department.clone()));
        }
        if let Some(start) = f.start_date {
            query.push(("startDate".to_string(), start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = f.end_date {
            query.push(("endDate".to_string(), end.format("%Y-%m-%d").to_string()));
        }
        query.push(("page".to_string(), f.page.to_string()));
        query.push(("limit".to_string(), f.limit.to_string()));
        query
    }
}
