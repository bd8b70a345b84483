pub mod google_calendar;
pub mod static_rules;

use crate::config::{Config, HolidaySourceKind};
use crate::domain::ports::holiday_source::{HolidaySource, SourceError};
use std::sync::Arc;

pub use google_calendar::GoogleCalendarSource;
pub use static_rules::StaticRulesSource;

/// Builds the holiday source selected by configuration.
pub fn build_holiday_source(config: &Config) -> Result<Arc<dyn HolidaySource>, SourceError> {
    match config.holiday_source {
        HolidaySourceKind::Static => Ok(Arc::new(StaticRulesSource::new())),
        HolidaySourceKind::GoogleCalendar => {
            let api_key = config.google_cal_api_key.clone().ok_or_else(|| {
                SourceError::Request("GOOGLE_CAL_API_KEY is not configured".to_string())
            })?;
            let source = GoogleCalendarSource::new(api_key, config.holiday_fetch_timeout)?;
            Ok(Arc::new(source))
        }
    }
}
