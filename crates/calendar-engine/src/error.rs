//! Error types for calendar-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Invalid anchor: {0}")]
    InvalidAnchor(String),
}

pub type Result<T> = std::result::Result<T, CalendarError>;
