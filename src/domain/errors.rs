use chrono::NaiveDate;
use thiserror::Error;

/// Everything that can stop a due-date calculation.
///
/// Each variant maps to exactly one `kind` string on the wire so clients can
/// tell bad input apart from a data source outage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalculationError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Day count must be at least 1, got {0}")]
    InvalidTarget(i64),
    #[error("No countable day found between {start} and {horizon}")]
    UnboundedSearch { start: NaiveDate, horizon: NaiveDate },
    #[error("Holiday data for {country_code} is unavailable: {reason}")]
    HolidaySourceUnavailable { country_code: String, reason: String },
    #[error("Calculation timed out")]
    Timeout,
}

impl CalculationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidTarget(_) => "invalid_target",
            Self::UnboundedSearch { .. } => "unbounded_search",
            Self::HolidaySourceUnavailable { .. } => "holiday_source_unavailable",
            Self::Timeout => "timeout",
        }
    }
}

pub type DomainResult<T> = Result<T, CalculationError>;
