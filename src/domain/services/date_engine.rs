//! Business-day counting.
//!
//! The engine walks forward one calendar day at a time from the start date,
//! asking a classifier whether each day is excluded. Excluded days are
//! recorded with their reason; every other day is counted until the target
//! is reached. The walk never goes past the caller-supplied horizon.

use crate::domain::entities::{CountingPlan, ExclusionEntry, ExclusionReason};
use crate::domain::errors::{CalculationError, DomainResult};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;

/// Due date plus the dates skipped on the way, in increasing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueDateOutcome {
    pub due_date: NaiveDate,
    pub exclusions: Vec<ExclusionEntry>,
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Exclusion predicate for one request.
#[derive(Debug, Clone, Copy)]
pub struct ExclusionRules<'a> {
    pub skip_weekends: bool,
    pub skip_holidays: bool,
    pub holidays: &'a BTreeSet<NaiveDate>,
}

impl<'a> ExclusionRules<'a> {
    /// Holiday wins over weekend so that a date lands in exactly one list.
    pub fn classify(&self, date: NaiveDate) -> Option<ExclusionReason> {
        if self.skip_holidays && self.holidays.contains(&date) {
            Some(ExclusionReason::Holiday)
        } else if self.skip_weekends && is_weekend(date) {
            Some(ExclusionReason::Weekend)
        } else {
            None
        }
    }
}

/// Counts `target_count` non-excluded days starting at `start` (or the day
/// after it) and returns the day the count is reached.
///
/// Fails with `InvalidTarget` when `target_count < 1` and with
/// `UnboundedSearch` when the walk passes `horizon` without reaching the
/// target.
pub fn compute_due_date<F>(
    start: NaiveDate,
    target_count: i64,
    include_start_as_day_one: bool,
    horizon: NaiveDate,
    mut is_excluded: F,
) -> DomainResult<DueDateOutcome>
where
    F: FnMut(NaiveDate) -> Option<ExclusionReason>,
{
    if target_count < 1 {
        return Err(CalculationError::InvalidTarget(target_count));
    }

    let unbounded = || CalculationError::UnboundedSearch { start, horizon };

    let mut cursor = if include_start_as_day_one {
        start
    } else {
        start.succ_opt().ok_or_else(unbounded)?
    };
    let mut counted = 0i64;
    let mut exclusions = Vec::new();

    loop {
        if cursor > horizon {
            return Err(unbounded());
        }

        match is_excluded(cursor) {
            Some(reason) => exclusions.push(ExclusionEntry::new(cursor, reason)),
            None => {
                counted += 1;
                if counted == target_count {
                    return Ok(DueDateOutcome {
                        due_date: cursor,
                        exclusions,
                    });
                }
            }
        }

        cursor = cursor.succ_opt().ok_or_else(unbounded)?;
    }
}

/// Runs the engine for a counting plan.
pub fn compute_for_plan<F>(
    plan: &CountingPlan,
    horizon: NaiveDate,
    is_excluded: F,
) -> DomainResult<DueDateOutcome>
where
    F: FnMut(NaiveDate) -> Option<ExclusionReason>,
{
    compute_due_date(
        plan.start,
        plan.target,
        plan.include_start,
        horizon,
        is_excluded,
    )
}

/// Moves a due date that lands on a weekend or holiday back to the closest
/// earlier weekday that is neither, never earlier than `floor`.
///
/// Exclusions on or after the adjusted date are dropped, since those days are
/// no longer between the start and the due date.
pub fn adjust_to_weekday(
    outcome: DueDateOutcome,
    floor: NaiveDate,
    holidays: &BTreeSet<NaiveDate>,
) -> DueDateOutcome {
    let mut due_date = outcome.due_date;
    while due_date > floor && (is_weekend(due_date) || holidays.contains(&due_date)) {
        match due_date.pred_opt() {
            Some(previous) => due_date = previous,
            None => break,
        }
    }

    if due_date == outcome.due_date {
        return outcome;
    }

    let exclusions = outcome
        .exclusions
        .into_iter()
        .filter(|entry| entry.date < due_date)
        .collect();

    DueDateOutcome {
        due_date,
        exclusions,
    }
}
