use async_trait::async_trait;
use chrono::{Datelike, Duration as DateDuration, NaiveDate, Weekday};
use ddd_calculator::application::services::{
    CalculationService, HolidayCacheConfig, HolidayProvider, RetryPolicy,
};
use ddd_calculator::domain::entities::Holiday;
use ddd_calculator::domain::ports::holiday_source::{HolidaySource, SourceError};
use ddd_calculator::domain::ports::task_spawner::TaskSpawner;
use ddd_calculator::domain::ports::time_service::TimeService;
use ddd_calculator::infrastructure::providers::StaticRulesSource;
use ddd_calculator::infrastructure::runtime::tokio::TokioTaskSpawner;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// In-memory holiday source with scripted failures, delays and call counting.
#[derive(Default)]
pub struct ScriptedHolidaySource {
    holidays: HashMap<String, Vec<Holiday>>,
    unsupported: HashSet<String>,
    remaining_failures: Mutex<HashMap<String, u32>>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<(String, i32), u32>>,
    total_calls: AtomicU32,
}

impl ScriptedHolidaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holiday(mut self, country_code: &str, day: NaiveDate, name: &str) -> Self {
        self.holidays
            .entry(country_code.to_string())
            .or_default()
            .push(Holiday::new(day, name, country_code));
        self
    }

    /// Fails the next `times` fetches for `country_code`.
    pub fn failing(self, country_code: &str, times: u32) -> Self {
        self.remaining_failures
            .lock()
            .unwrap()
            .insert(country_code.to_string(), times);
        self
    }

    pub fn always_failing(self, country_code: &str) -> Self {
        self.failing(country_code, u32::MAX)
    }

    pub fn unsupported(mut self, country_code: &str) -> Self {
        self.unsupported.insert(country_code.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls_for(&self, country_code: &str, year: i32) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&(country_code.to_string(), year))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.total_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HolidaySource for ScriptedHolidaySource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports(&self, country_code: &str) -> bool {
        !self.unsupported.contains(country_code)
    }

    async fn fetch(&self, country_code: &str, year: i32) -> Result<Vec<Holiday>, SourceError> {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap()
            .entry((country_code.to_string(), year))
            .or_default() += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.unsupported.contains(country_code) {
            return Err(SourceError::UnsupportedCountry(country_code.to_string()));
        }

        {
            let mut failures = self.remaining_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(country_code) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SourceError::Request("scripted outage".to_string()));
                }
            }
        }

        Ok(self
            .holidays
            .get(country_code)
            .map(|holidays| {
                holidays
                    .iter()
                    .filter(|h| h.date.year() == year)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Marks every weekday in `from..=to` as a holiday.
pub fn weekday_holidays(
    mut source: ScriptedHolidaySource,
    country_code: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> ScriptedHolidaySource {
    let mut day = from;
    while day <= to {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            source = source.with_holiday(country_code, day, "Shutdown");
        }
        day += DateDuration::days(1);
    }
    source
}

/// Returns immediately and remembers every requested delay.
#[derive(Default)]
pub struct RecordingTimeService {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingTimeService {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimeService for RecordingTimeService {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub fn test_cache_config() -> HolidayCacheConfig {
    HolidayCacheConfig {
        ttl: Duration::from_secs(3600),
        capacity: 64,
        fetch_timeout: Duration::from_secs(5),
        retry: RetryPolicy::new(3).with_initial_backoff(Duration::from_millis(10)),
    }
}

pub fn provider_with(
    source: Arc<dyn HolidaySource>,
    config: HolidayCacheConfig,
) -> (HolidayProvider, Arc<RecordingTimeService>) {
    let time = Arc::new(RecordingTimeService::default());
    let provider = HolidayProvider::new(
        source,
        config,
        time.clone() as Arc<dyn TimeService>,
        Arc::new(TokioTaskSpawner::new()) as Arc<dyn TaskSpawner>,
    );
    (provider, time)
}

pub fn service_with(source: Arc<dyn HolidaySource>) -> CalculationService {
    service_with_lookahead(source, ddd_calculator::DEFAULT_MAX_LOOKAHEAD_DAYS)
}

pub fn service_with_lookahead(
    source: Arc<dyn HolidaySource>,
    max_lookahead_days: i64,
) -> CalculationService {
    let (provider, _) = provider_with(source, test_cache_config());
    CalculationService::new(provider, max_lookahead_days)
}

pub fn static_service() -> CalculationService {
    service_with(Arc::new(StaticRulesSource::new()))
}
