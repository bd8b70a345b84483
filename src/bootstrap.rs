use crate::application::services::{
    CalculationService, HolidayCacheConfig, HolidayProvider, RetryPolicy,
};
use crate::config::Config;
use crate::domain::ports::holiday_source::{HolidaySource, SourceError};
use crate::domain::ports::task_spawner::TaskSpawner;
use crate::domain::ports::time_service::TimeService;
use crate::infrastructure::http::middleware::AppState;
use crate::infrastructure::providers::build_holiday_source;
use crate::infrastructure::runtime::tokio::{TokioTaskSpawner, TokioTimeService};
use std::sync::Arc;

/// Cache settings derived from configuration.
pub fn holiday_cache_config(config: &Config) -> HolidayCacheConfig {
    HolidayCacheConfig {
        ttl: config.holiday_cache_ttl,
        capacity: config.holiday_cache_capacity,
        fetch_timeout: config.holiday_fetch_timeout,
        retry: RetryPolicy::new(config.holiday_fetch_max_attempts)
            .with_initial_backoff(config.holiday_fetch_backoff),
    }
}

/// Wires the application around an already built holiday source.
pub fn build_app_state_with_source(source: Arc<dyn HolidaySource>, config: &Config) -> AppState {
    let task_spawner = Arc::new(TokioTaskSpawner::new()) as Arc<dyn TaskSpawner>;
    let time_service = Arc::new(TokioTimeService::new()) as Arc<dyn TimeService>;

    let provider = HolidayProvider::new(
        source,
        holiday_cache_config(config),
        time_service,
        task_spawner,
    );
    tracing::info!(
        "Holiday provider initialized (source: {}, ttl: {}s, capacity: {})",
        provider.source_name(),
        config.holiday_cache_ttl.as_secs(),
        config.holiday_cache_capacity
    );

    let calculation_service = Arc::new(CalculationService::new(
        provider,
        config.max_lookahead_days,
    ));
    tracing::info!(
        "Calculation service initialized (max lookahead: {} days)",
        config.max_lookahead_days
    );

    AppState::new(calculation_service, config.request_timeout)
}

pub fn build_app_state(config: &Config) -> Result<AppState, SourceError> {
    let source = build_holiday_source(config)?;
    Ok(build_app_state_with_source(source, config))
}
