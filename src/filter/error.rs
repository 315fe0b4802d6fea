use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid page: {0}")]
    InvalidPage(u32),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}
