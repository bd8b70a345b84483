use crate::application::services::holiday_provider::HolidayProvider;
use crate::domain::entities::{
    CalculationRequest, CalculationResult, CountingPlan, ExclusionReason, HolidayCalendar,
    TermKind,
};
use crate::domain::errors::{CalculationError, DomainResult};
use crate::domain::services::{
    adjust_to_weekday, aggregate, compute_for_plan, display_name, AggregatedHolidays,
    DueDateOutcome, ExclusionRules,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::{debug, info};

/// Default number of days the search may run past the day count before it
/// gives up, roughly ten years.
pub const DEFAULT_MAX_LOOKAHEAD_DAYS: i64 = 3660;

/// Largest day span handed to chrono, well past the last representable date.
const MAX_SPAN_DAYS: i64 = i32::MAX as i64;

/// Orchestrates validation, holiday loading, aggregation and counting.
#[derive(Clone)]
pub struct CalculationService {
    provider: HolidayProvider,
    max_lookahead_days: i64,
}

impl CalculationService {
    pub fn new(provider: HolidayProvider, max_lookahead_days: i64) -> Self {
        Self {
            provider,
            max_lookahead_days: max_lookahead_days.clamp(1, MAX_SPAN_DAYS),
        }
    }

    pub fn provider(&self) -> &HolidayProvider {
        &self.provider
    }

    /// Computes the due date for `request`.
    #[tracing::instrument(skip(self, request), fields(term = %request.term_kind, delivery = %request.delivery_date))]
    pub async fn calculate(&self, request: CalculationRequest) -> DomainResult<CalculationResult> {
        let request = request.validate()?;
        if request.needs_holiday_data() {
            self.check_supported(&request.country_codes)?;
        }

        let result = match request.counting_plan()? {
            Some(plan) => self.calculate_counted(&request, &plan).await?,
            None => due_on_delivery(&request),
        };

        info!(
            "Calculated {} due date {} for delivery {} ({} weekend(s), {} holiday(s) excluded)",
            result.term_kind,
            result.due_date,
            result.delivery_date,
            result.excluded_weekends.len(),
            result.excluded_holidays.len()
        );

        Ok(result)
    }

    /// Like [`calculate`](Self::calculate), abandoning the wait after
    /// `timeout`. Holiday fetches already started keep running into the cache.
    pub async fn calculate_within(
        &self,
        request: CalculationRequest,
        timeout: std::time::Duration,
    ) -> DomainResult<CalculationResult> {
        tokio::time::timeout(timeout, self.calculate(request))
            .await
            .map_err(|_| CalculationError::Timeout)?
    }

    fn check_supported(&self, country_codes: &[String]) -> DomainResult<()> {
        let unsupported: Vec<&str> = country_codes
            .iter()
            .filter(|code| !self.provider.supports(code))
            .map(String::as_str)
            .collect();

        if unsupported.is_empty() {
            Ok(())
        } else {
            Err(CalculationError::validation(format!(
                "Unsupported country code(s) for holiday source '{}': {}",
                self.provider.source_name(),
                unsupported.join(", ")
            )))
        }
    }

    async fn calculate_counted(
        &self,
        request: &CalculationRequest,
        plan: &CountingPlan,
    ) -> DomainResult<CalculationResult> {
        let needs_holidays = request.needs_holiday_data();
        let first_day = plan.first_day().ok_or(CalculationError::UnboundedSearch {
            start: plan.start,
            horizon: plan.start,
        })?;
        // Measured past the day count: only excluded days use up the lookahead.
        let window = plan
            .target
            .saturating_add(self.max_lookahead_days)
            .min(MAX_SPAN_DAYS);
        let max_horizon = first_day
            .checked_add_signed(Duration::days(window))
            .unwrap_or(NaiveDate::MAX);
        let earliest_due = Duration::days(plan.target.saturating_sub(1).min(MAX_SPAN_DAYS));
        if first_day.checked_add_signed(earliest_due).is_none() {
            return Err(CalculationError::UnboundedSearch {
                start: plan.start,
                horizon: max_horizon,
            });
        }

        // Initial guess of how far the count reaches, widened a year at a time
        // if the engine runs off the end of the loaded calendars.
        let estimate_days = plan.target.saturating_mul(2).saturating_add(30).min(window);
        let estimate = first_day
            .checked_add_signed(Duration::days(estimate_days))
            .unwrap_or(max_horizon)
            .min(max_horizon);
        let first_year = request.delivery_date.year();
        let mut last_year = estimate.year();

        loop {
            let (horizon, holidays) = if needs_holidays {
                let holidays = self
                    .load_holidays(&request.country_codes, first_year..=last_year)
                    .await?;
                (year_end(last_year).min(max_horizon), holidays)
            } else {
                (max_horizon, AggregatedHolidays::default())
            };

            let rules = ExclusionRules {
                skip_weekends: request.skip_weekends,
                skip_holidays: request.skip_holidays,
                holidays: &holidays.exclusion_set,
            };

            match compute_for_plan(plan, horizon, |date| rules.classify(date)) {
                Ok(outcome) => {
                    let outcome = if request.adjust_to_weekday {
                        adjust_to_weekday(outcome, request.delivery_date, &holidays.exclusion_set)
                    } else {
                        outcome
                    };
                    return Ok(assemble(request, outcome, &holidays));
                }
                Err(CalculationError::UnboundedSearch { .. }) if horizon < max_horizon => {
                    last_year += 1;
                    debug!(
                        "Count passed {}, extending holiday range to {}",
                        horizon, last_year
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetches every country concurrently and merges them. The first failing
    /// country in request order fails the whole load.
    async fn load_holidays(
        &self,
        country_codes: &[String],
        years: RangeInclusive<i32>,
    ) -> DomainResult<AggregatedHolidays> {
        let fetches = country_codes
            .iter()
            .map(|code| self.provider.get_holidays(code, years.clone()));
        let calendars = futures::future::join_all(fetches)
            .await
            .into_iter()
            .collect::<DomainResult<Vec<HolidayCalendar>>>()?;

        Ok(aggregate(country_codes, &calendars))
    }
}

fn year_end(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

fn due_on_delivery(request: &CalculationRequest) -> CalculationResult {
    CalculationResult {
        delivery_date: request.delivery_date,
        due_date: request.delivery_date,
        days: request.days,
        country_codes: request.country_codes.clone(),
        term_kind: request.term_kind,
        excluded_weekends: Vec::new(),
        excluded_holidays: Vec::new(),
        holiday_names: BTreeMap::new(),
        holiday_names_by_country: BTreeMap::new(),
        holidays_excluded: false,
    }
}

fn assemble(
    request: &CalculationRequest,
    outcome: DueDateOutcome,
    holidays: &AggregatedHolidays,
) -> CalculationResult {
    let mut excluded_weekends = Vec::new();
    let mut excluded_holidays = Vec::new();
    let mut holiday_names = BTreeMap::new();
    let mut holiday_names_by_country = BTreeMap::new();

    for mut entry in outcome.exclusions {
        match entry.reason {
            ExclusionReason::Weekend => excluded_weekends.push(entry.date),
            ExclusionReason::Holiday => {
                entry.holiday_names = holidays.names_on(entry.date).to_vec();
                holiday_names.insert(entry.date, display_name(&entry.holiday_names));
                holiday_names_by_country.insert(
                    entry.date,
                    entry.holiday_names.into_iter().collect::<BTreeMap<_, _>>(),
                );
                excluded_holidays.push(entry.date);
            }
        }
    }

    CalculationResult {
        delivery_date: request.delivery_date,
        due_date: outcome.due_date,
        days: request.days,
        country_codes: request.country_codes.clone(),
        term_kind: request.term_kind,
        excluded_weekends,
        excluded_holidays,
        holiday_names,
        holiday_names_by_country,
        holidays_excluded: request.term_kind == TermKind::Ddd && request.skip_holidays,
    }
}
