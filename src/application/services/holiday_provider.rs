use crate::domain::entities::{Holiday, HolidayCalendar};
use crate::domain::errors::{CalculationError, DomainResult};
use crate::domain::ports::holiday_source::{HolidaySource, SourceError};
use crate::domain::ports::task_spawner::TaskSpawner;
use crate::domain::ports::time_service::TimeService;
use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::counter;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

type CacheKey = (String, i32);
type FetchOutcome = Result<Arc<Vec<Holiday>>, SourceError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

/// Bounded exponential backoff for source fetches.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: u32,
}

impl RetryPolicy {
    /// Defaults: initial=200ms, max=5s, multiplier=2
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            multiplier: 2,
        }
    }

    pub fn with_initial_backoff(mut self, initial: Duration) -> Self {
        self.initial_backoff = initial;
        self
    }

    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

#[derive(Debug, Clone)]
pub struct HolidayCacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HolidayCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7 * 24 * 60 * 60),
            capacity: 512,
            fetch_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub in_flight: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheEntry {
    holidays: Arc<Vec<Holiday>>,
    fetched_at: Instant,
    last_used: u64,
}

struct InFlight {
    /// Tells a fetch apart from a later one for the same key after `clear`
    id: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    in_flight: HashMap<CacheKey, InFlight>,
    clock: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Drops least recently used entries until at most `capacity` remain.
    fn evict_to(&mut self, capacity: usize) -> u64 {
        let mut evicted = 0;
        while self.entries.len() > capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }
        self.evictions += evicted;
        evicted
    }
}

/// Cached access to a holiday source, keyed by (country, year).
///
/// Entries live for `ttl` and are evicted least-recently-used past
/// `capacity`. Concurrent misses on one key share a single fetch, which runs
/// as a detached task and lands in the cache even if every caller gave up.
#[derive(Clone)]
pub struct HolidayProvider {
    source: Arc<dyn HolidaySource>,
    state: Arc<Mutex<CacheState>>,
    config: Arc<HolidayCacheConfig>,
    time: Arc<dyn TimeService>,
    spawner: Arc<dyn TaskSpawner>,
}

impl HolidayProvider {
    pub fn new(
        source: Arc<dyn HolidaySource>,
        config: HolidayCacheConfig,
        time: Arc<dyn TimeService>,
        spawner: Arc<dyn TaskSpawner>,
    ) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CacheState::default())),
            config: Arc::new(HolidayCacheConfig {
                capacity: config.capacity.max(1),
                ..config
            }),
            time,
            spawner,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub fn supports(&self, country_code: &str) -> bool {
        self.source.supports(country_code)
    }

    /// Holidays of one country over `years`, fetching missing years in
    /// parallel.
    pub async fn get_holidays(
        &self,
        country_code: &str,
        years: RangeInclusive<i32>,
    ) -> DomainResult<HolidayCalendar> {
        let fetches = years.map(|year| self.get_year(country_code, year));
        let results = futures::future::join_all(fetches).await;

        let mut calendar = HolidayCalendar::new(country_code);
        for result in results {
            let holidays =
                result.map_err(|e| CalculationError::HolidaySourceUnavailable {
                    country_code: country_code.to_string(),
                    reason: e.to_string(),
                })?;
            calendar.extend(holidays.iter().cloned());
        }

        Ok(calendar)
    }

    /// Holidays of one country-year, served from cache when fresh.
    pub async fn get_year(&self, country_code: &str, year: i32) -> FetchOutcome {
        let key = (country_code.to_string(), year);

        let pending = {
            let mut state = self.state.lock().await;
            let clock = state.tick();

            if let Some(entry) = state.entries.get_mut(&key) {
                if entry.fetched_at.elapsed() < self.config.ttl {
                    entry.last_used = clock;
                    let holidays = entry.holidays.clone();
                    state.hits += 1;
                    counter!("holiday_cache_hits_total", "source" => self.source.name())
                        .increment(1);
                    debug!("Holiday cache hit for {} {}", country_code, year);
                    return Ok(holidays);
                }
            }

            state.misses += 1;
            counter!("holiday_cache_misses_total", "source" => self.source.name()).increment(1);

            match state.in_flight.get(&key) {
                Some(pending) => {
                    debug!("Joining in-flight holiday fetch for {} {}", country_code, year);
                    pending.fetch.clone()
                }
                None => {
                    debug!("Holiday cache miss for {} {}, fetching", country_code, year);
                    let id = clock;
                    let fetch = self.spawn_fetch(key.clone(), id);
                    state.in_flight.insert(
                        key,
                        InFlight {
                            id,
                            fetch: fetch.clone(),
                        },
                    );
                    fetch
                }
            }
        };

        pending.await
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            entries: state.entries.len(),
            in_flight: state.in_flight.len(),
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }

    /// Empties the cache. Fetches still running complete into the emptied
    /// cache.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let dropped = state.entries.len();
        state.entries.clear();
        state.in_flight.clear();
        info!("Holiday cache cleared ({} entries dropped)", dropped);
    }

    fn spawn_fetch(&self, key: CacheKey, id: u64) -> SharedFetch {
        let (tx, rx) = oneshot::channel();
        let source = self.source.clone();
        let time = self.time.clone();
        let config = self.config.clone();
        let state = self.state.clone();

        self.spawner.spawn(Box::pin(async move {
            let (country_code, year) = (key.0.as_str(), key.1);
            let outcome =
                fetch_with_retry(source.as_ref(), time.as_ref(), &config, country_code, year)
                    .await;

            {
                let mut state = state.lock().await;
                if state.in_flight.get(&key).map(|pending| pending.id) == Some(id) {
                    state.in_flight.remove(&key);
                }
                if let Ok(holidays) = &outcome {
                    let clock = state.tick();
                    state.entries.insert(
                        key.clone(),
                        CacheEntry {
                            holidays: holidays.clone(),
                            fetched_at: Instant::now(),
                            last_used: clock,
                        },
                    );
                    let evicted = state.evict_to(config.capacity);
                    if evicted > 0 {
                        counter!("holiday_cache_evictions_total").increment(evicted);
                        debug!("Evicted {} holiday cache entries", evicted);
                    }
                }
            }

            // Nobody may be listening any more; the cache is already updated.
            let _ = tx.send(outcome);
        }));

        rx.map(|received| received.unwrap_or(Err(SourceError::Aborted)))
            .boxed()
            .shared()
    }
}

async fn fetch_with_retry(
    source: &dyn HolidaySource,
    time: &dyn TimeService,
    config: &HolidayCacheConfig,
    country_code: &str,
    year: i32,
) -> FetchOutcome {
    let max_attempts = config.retry.max_attempts();
    let mut attempt = 1;

    loop {
        let result =
            match tokio::time::timeout(config.fetch_timeout, source.fetch(country_code, year))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(SourceError::Request(format!(
                    "timed out after {} ms",
                    config.fetch_timeout.as_millis()
                ))),
            };

        match result {
            Ok(holidays) => {
                info!(
                    "Fetched {} holidays for {} {} from {}",
                    holidays.len(),
                    country_code,
                    year,
                    source.name()
                );
                return Ok(Arc::new(holidays));
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = config.retry.delay_for(attempt);
                warn!(
                    "Holiday fetch for {} {} failed (attempt {}/{}): {}. Retrying in {} ms",
                    country_code,
                    year,
                    attempt,
                    max_attempts,
                    e,
                    delay.as_millis()
                );
                time.sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                counter!("holiday_fetch_failures_total", "source" => source.name()).increment(1);
                error!(
                    "Holiday fetch for {} {} failed after {} attempt(s): {}",
                    country_code, year, attempt, e
                );
                return Err(e);
            }
        }
    }
}
