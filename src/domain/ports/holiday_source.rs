use crate::domain::entities::Holiday;
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a holiday data source for one (country, year) fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Country not supported by this source: {0}")]
    UnsupportedCountry(String),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("No holiday data for {country_code} in {year}")]
    YearNotCovered { country_code: String, year: i32 },
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Fetch was abandoned before completing")]
    Aborted,
}

impl SourceError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SourceError::UnsupportedCountry(_) | SourceError::YearNotCovered { .. }
        )
    }
}

/// A source of public holiday data, queried one country-year at a time.
#[async_trait]
pub trait HolidaySource: Send + Sync {
    /// Short identifier used in logs and metrics.
    fn name(&self) -> &'static str;

    fn supports(&self, country_code: &str) -> bool;

    /// All public holidays of `country_code` falling in `year`.
    async fn fetch(&self, country_code: &str, year: i32) -> Result<Vec<Holiday>, SourceError>;
}
