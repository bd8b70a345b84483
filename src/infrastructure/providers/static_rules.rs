//! Public holidays computed from rule tables.
//!
//! Each supported country is a list of rules: fixed dates, dates relative to
//! Easter Sunday, and nth/last weekday-of-month dates. Weekend handling
//! follows the country's practice: US federal holidays are observed on the
//! nearest weekday, UK-style substitute days go to the next free weekday, and
//! some holidays simply move.
//!
//! Holidays set by the lunar, Islamic or Hindu calendars (KR, SG) come from
//! per-year date tables. A year outside a table is reported as not covered
//! rather than silently returned without those holidays.

use crate::domain::entities::Holiday;
use crate::domain::ports::holiday_source::{HolidaySource, SourceError};
use crate::domain::services::is_weekend;
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

pub const SUPPORTED_COUNTRIES: &[&str] = &[
    "US", "GB", "DE", "FR", "IT", "ES", "NL", "BE", "CA", "AU", "KR", "SG",
];

type DateTable = &'static [(i32, u32, u32)];

const KR_SEOLLAL: DateTable = &[
    (2020, 1, 25),
    (2021, 2, 12),
    (2022, 2, 1),
    (2023, 1, 22),
    (2024, 2, 10),
    (2025, 1, 29),
    (2026, 2, 17),
    (2027, 2, 7),
    (2028, 1, 26),
    (2029, 2, 13),
    (2030, 2, 3),
];

const KR_BUDDHAS_BIRTHDAY: DateTable = &[
    (2020, 4, 30),
    (2021, 5, 19),
    (2022, 5, 8),
    (2023, 5, 27),
    (2024, 5, 15),
    (2025, 5, 5),
    (2026, 5, 24),
    (2027, 5, 13),
    (2028, 5, 2),
    (2029, 5, 20),
    (2030, 5, 9),
];

const KR_CHUSEOK: DateTable = &[
    (2020, 10, 1),
    (2021, 9, 21),
    (2022, 9, 10),
    (2023, 9, 29),
    (2024, 9, 17),
    (2025, 10, 6),
    (2026, 9, 25),
    (2027, 9, 15),
    (2028, 10, 3),
    (2029, 9, 22),
    (2030, 9, 12),
];

// Singapore gazettes these a year or two ahead.
const SG_CHINESE_NEW_YEAR: DateTable = &[
    (2020, 1, 25),
    (2021, 2, 12),
    (2022, 2, 1),
    (2023, 1, 22),
    (2024, 2, 10),
    (2025, 1, 29),
    (2026, 2, 17),
];

const SG_HARI_RAYA_PUASA: DateTable = &[
    (2020, 5, 24),
    (2021, 5, 13),
    (2022, 5, 3),
    (2023, 4, 22),
    (2024, 4, 10),
    (2025, 3, 31),
    (2026, 3, 21),
];

const SG_VESAK_DAY: DateTable = &[
    (2020, 5, 7),
    (2021, 5, 26),
    (2022, 5, 15),
    (2023, 6, 2),
    (2024, 5, 22),
    (2025, 5, 12),
    (2026, 5, 31),
];

const SG_HARI_RAYA_HAJI: DateTable = &[
    (2020, 7, 31),
    (2021, 7, 20),
    (2022, 7, 10),
    (2023, 6, 29),
    (2024, 6, 17),
    (2025, 6, 7),
    (2026, 5, 27),
];

const SG_DEEPAVALI: DateTable = &[
    (2020, 11, 14),
    (2021, 11, 4),
    (2022, 10, 24),
    (2023, 11, 12),
    (2024, 10, 31),
    (2025, 10, 20),
    (2026, 11, 8),
];

/// Easter Sunday by the anonymous Gregorian algorithm.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15).rem_euclid(30);
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k).rem_euclid(7);
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[derive(Debug, Clone, Copy)]
enum When {
    Fixed { month: u32, day: u32 },
    /// Days after Easter Sunday (negative for before)
    Easter(i64),
    NthWeekday { month: u32, weekday: Weekday, n: u8 },
    LastWeekday { month: u32, weekday: Weekday },
    /// Last `weekday` falling on or before month/day
    WeekdayOnOrBefore { month: u32, day: u32, weekday: Weekday },
    /// Days after the year's entry in a date table
    Table { dates: DateTable, offset: i64 },
}

impl When {
    fn resolve(&self, year: i32) -> Option<NaiveDate> {
        match *self {
            When::Fixed { month, day } => NaiveDate::from_ymd_opt(year, month, day),
            When::Easter(offset) => {
                easter_sunday(year).and_then(|e| e.checked_add_signed(Duration::days(offset)))
            }
            When::NthWeekday { month, weekday, n } => {
                NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
            }
            When::LastWeekday { month, weekday } => {
                let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
                let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()?;
                let back = (last.weekday().num_days_from_monday() + 7
                    - weekday.num_days_from_monday())
                    % 7;
                last.checked_sub_signed(Duration::days(back as i64))
            }
            When::WeekdayOnOrBefore { month, day, weekday } => {
                let anchor = NaiveDate::from_ymd_opt(year, month, day)?;
                let back = (anchor.weekday().num_days_from_monday() + 7
                    - weekday.num_days_from_monday())
                    % 7;
                anchor.checked_sub_signed(Duration::days(back as i64))
            }
            When::Table { dates, offset } => dates
                .iter()
                .find(|(y, _, _)| *y == year)
                .and_then(|&(y, month, day)| NaiveDate::from_ymd_opt(y, month, day))
                .and_then(|date| date.checked_add_signed(Duration::days(offset))),
        }
    }

    fn covers(&self, year: i32) -> bool {
        match self {
            When::Table { dates, .. } => dates.iter().any(|(y, _, _)| *y == year),
            _ => true,
        }
    }
}

/// What happens when a holiday falls on a weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observance {
    /// Nothing; the weekend date stands alone
    Actual,
    /// Saturday observed on Friday, Sunday on Monday (US federal)
    NearestWeekday,
    /// A substitute day on the next weekday that is not already a holiday
    NextFreeWeekday,
    /// Same, but only a Sunday triggers it (KR Seollal/Chuseok, SG)
    NextFreeWeekdayIfSunday,
    /// A Sunday holiday moves to the Saturday before
    SaturdayIfSunday,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    name: &'static str,
    when: When,
    observance: Observance,
    /// First year the observance applies; earlier years use `Actual`
    observed_from: i32,
    applies: fn(i32) -> bool,
}

fn always(_: i32) -> bool {
    true
}

fn since_2014(year: i32) -> bool {
    year >= 2014
}

fn since_2021(year: i32) -> bool {
    year >= 2021
}

fn lustrum(year: i32) -> bool {
    year % 5 == 0
}

impl Rule {
    fn fixed(name: &'static str, month: u32, day: u32) -> Self {
        Self::new(name, When::Fixed { month, day })
    }

    fn easter(name: &'static str, offset: i64) -> Self {
        Self::new(name, When::Easter(offset))
    }

    fn nth(name: &'static str, month: u32, weekday: Weekday, n: u8) -> Self {
        Self::new(name, When::NthWeekday { month, weekday, n })
    }

    fn last(name: &'static str, month: u32, weekday: Weekday) -> Self {
        Self::new(name, When::LastWeekday { month, weekday })
    }

    fn dated(name: &'static str, dates: DateTable, offset: i64) -> Self {
        Self::new(name, When::Table { dates, offset })
    }

    fn new(name: &'static str, when: When) -> Self {
        Self {
            name,
            when,
            observance: Observance::Actual,
            observed_from: i32::MIN,
            applies: always,
        }
    }

    fn observed(mut self, observance: Observance) -> Self {
        self.observance = observance;
        self
    }

    fn observed_since(mut self, observance: Observance, year: i32) -> Self {
        self.observance = observance;
        self.observed_from = year;
        self
    }

    fn observance_in(&self, year: i32) -> Observance {
        if year >= self.observed_from {
            self.observance
        } else {
            Observance::Actual
        }
    }

    fn only_if(mut self, applies: fn(i32) -> bool) -> Self {
        self.applies = applies;
        self
    }
}

fn rules_for(country_code: &str) -> Option<Vec<Rule>> {
    use Observance::*;
    use Weekday::*;

    let rules = match country_code {
        "US" => vec![
            Rule::fixed("New Year's Day", 1, 1).observed(NearestWeekday),
            Rule::nth("Martin Luther King Jr. Day", 1, Mon, 3),
            Rule::nth("Washington's Birthday", 2, Mon, 3),
            Rule::last("Memorial Day", 5, Mon),
            Rule::fixed("Juneteenth National Independence Day", 6, 19)
                .observed(NearestWeekday)
                .only_if(since_2021),
            Rule::fixed("Independence Day", 7, 4).observed(NearestWeekday),
            Rule::nth("Labor Day", 9, Mon, 1),
            Rule::nth("Columbus Day", 10, Mon, 2),
            Rule::fixed("Veterans Day", 11, 11).observed(NearestWeekday),
            Rule::nth("Thanksgiving Day", 11, Thu, 4),
            Rule::fixed("Christmas Day", 12, 25).observed(NearestWeekday),
        ],
        "GB" => vec![
            Rule::fixed("New Year's Day", 1, 1).observed(NextFreeWeekday),
            Rule::easter("Good Friday", -2),
            Rule::easter("Easter Monday", 1),
            Rule::nth("Early May Bank Holiday", 5, Mon, 1),
            Rule::last("Spring Bank Holiday", 5, Mon),
            Rule::last("Summer Bank Holiday", 8, Mon),
            Rule::fixed("Christmas Day", 12, 25).observed(NextFreeWeekday),
            Rule::fixed("Boxing Day", 12, 26).observed(NextFreeWeekday),
        ],
        "DE" => vec![
            Rule::fixed("New Year's Day", 1, 1),
            Rule::easter("Good Friday", -2),
            Rule::easter("Easter Monday", 1),
            Rule::fixed("Labour Day", 5, 1),
            Rule::easter("Ascension Day", 39),
            Rule::easter("Whit Monday", 50),
            Rule::fixed("Day of German Unity", 10, 3),
            Rule::fixed("Christmas Day", 12, 25),
            Rule::fixed("Second Day of Christmas", 12, 26),
        ],
        "FR" => vec![
            Rule::fixed("New Year's Day", 1, 1),
            Rule::easter("Easter Monday", 1),
            Rule::fixed("Labour Day", 5, 1),
            Rule::fixed("Victory in Europe Day", 5, 8),
            Rule::easter("Ascension Day", 39),
            Rule::easter("Whit Monday", 50),
            Rule::fixed("Bastille Day", 7, 14),
            Rule::fixed("Assumption Day", 8, 15),
            Rule::fixed("All Saints' Day", 11, 1),
            Rule::fixed("Armistice Day", 11, 11),
            Rule::fixed("Christmas Day", 12, 25),
        ],
        "IT" => vec![
            Rule::fixed("New Year's Day", 1, 1),
            Rule::fixed("Epiphany", 1, 6),
            Rule::easter("Easter Monday", 1),
            Rule::fixed("Liberation Day", 4, 25),
            Rule::fixed("Labour Day", 5, 1),
            Rule::fixed("Republic Day", 6, 2),
            Rule::fixed("Assumption Day", 8, 15),
            Rule::fixed("All Saints' Day", 11, 1),
            Rule::fixed("Immaculate Conception", 12, 8),
            Rule::fixed("Christmas Day", 12, 25),
            Rule::fixed("St. Stephen's Day", 12, 26),
        ],
        "ES" => vec![
            Rule::fixed("New Year's Day", 1, 1),
            Rule::fixed("Epiphany", 1, 6),
            Rule::easter("Good Friday", -2),
            Rule::fixed("Labour Day", 5, 1),
            Rule::fixed("Assumption Day", 8, 15),
            Rule::fixed("National Day of Spain", 10, 12),
            Rule::fixed("All Saints' Day", 11, 1),
            Rule::fixed("Constitution Day", 12, 6),
            Rule::fixed("Immaculate Conception", 12, 8),
            Rule::fixed("Christmas Day", 12, 25),
        ],
        "NL" => vec![
            Rule::fixed("New Year's Day", 1, 1),
            Rule::easter("Easter Monday", 1),
            Rule::fixed("King's Day", 4, 27)
                .observed(SaturdayIfSunday)
                .only_if(since_2014),
            Rule::fixed("Liberation Day", 5, 5).only_if(lustrum),
            Rule::easter("Ascension Day", 39),
            Rule::easter("Whit Monday", 50),
            Rule::fixed("Christmas Day", 12, 25),
            Rule::fixed("Second Day of Christmas", 12, 26),
        ],
        "BE" => vec![
            Rule::fixed("New Year's Day", 1, 1),
            Rule::easter("Easter Monday", 1),
            Rule::fixed("Labour Day", 5, 1),
            Rule::easter("Ascension Day", 39),
            Rule::easter("Whit Monday", 50),
            Rule::fixed("Belgian National Day", 7, 21),
            Rule::fixed("Assumption Day", 8, 15),
            Rule::fixed("All Saints' Day", 11, 1),
            Rule::fixed("Armistice Day", 11, 11),
            Rule::fixed("Christmas Day", 12, 25),
        ],
        "CA" => vec![
            Rule::fixed("New Year's Day", 1, 1).observed(NextFreeWeekday),
            Rule::easter("Good Friday", -2),
            Rule::new(
                "Victoria Day",
                When::WeekdayOnOrBefore {
                    month: 5,
                    day: 24,
                    weekday: Mon,
                },
            ),
            Rule::fixed("Canada Day", 7, 1).observed(NextFreeWeekday),
            Rule::nth("Labour Day", 9, Mon, 1),
            Rule::fixed("National Day for Truth and Reconciliation", 9, 30)
                .observed(NextFreeWeekday)
                .only_if(since_2021),
            Rule::nth("Thanksgiving", 10, Mon, 2),
            Rule::fixed("Remembrance Day", 11, 11),
            Rule::fixed("Christmas Day", 12, 25).observed(NextFreeWeekday),
            Rule::fixed("Boxing Day", 12, 26).observed(NextFreeWeekday),
        ],
        "AU" => vec![
            Rule::fixed("New Year's Day", 1, 1).observed(NextFreeWeekday),
            Rule::fixed("Australia Day", 1, 26).observed(NextFreeWeekday),
            Rule::easter("Good Friday", -2),
            Rule::easter("Easter Monday", 1),
            Rule::fixed("Anzac Day", 4, 25),
            Rule::nth("King's Birthday", 6, Mon, 2),
            Rule::fixed("Christmas Day", 12, 25).observed(NextFreeWeekday),
            Rule::fixed("Boxing Day", 12, 26).observed(NextFreeWeekday),
        ],
        "KR" => vec![
            Rule::fixed("New Year's Day", 1, 1),
            Rule::dated("Day before Seollal", KR_SEOLLAL, -1)
                .observed_since(NextFreeWeekdayIfSunday, 2014),
            Rule::dated("Seollal", KR_SEOLLAL, 0).observed_since(NextFreeWeekdayIfSunday, 2014),
            Rule::dated("Day after Seollal", KR_SEOLLAL, 1)
                .observed_since(NextFreeWeekdayIfSunday, 2014),
            Rule::fixed("Independence Movement Day", 3, 1).observed_since(NextFreeWeekday, 2021),
            Rule::fixed("Children's Day", 5, 5).observed_since(NextFreeWeekday, 2014),
            Rule::dated("Buddha's Birthday", KR_BUDDHAS_BIRTHDAY, 0)
                .observed_since(NextFreeWeekday, 2023),
            Rule::fixed("Memorial Day", 6, 6),
            Rule::fixed("Liberation Day", 8, 15).observed_since(NextFreeWeekday, 2021),
            Rule::dated("Day before Chuseok", KR_CHUSEOK, -1)
                .observed_since(NextFreeWeekdayIfSunday, 2014),
            Rule::dated("Chuseok", KR_CHUSEOK, 0).observed_since(NextFreeWeekdayIfSunday, 2014),
            Rule::dated("Day after Chuseok", KR_CHUSEOK, 1)
                .observed_since(NextFreeWeekdayIfSunday, 2014),
            Rule::fixed("National Foundation Day", 10, 3).observed_since(NextFreeWeekday, 2021),
            Rule::fixed("Hangul Day", 10, 9).observed_since(NextFreeWeekday, 2021),
            Rule::fixed("Christmas Day", 12, 25).observed_since(NextFreeWeekday, 2023),
        ],
        "SG" => vec![
            Rule::fixed("New Year's Day", 1, 1).observed(NextFreeWeekdayIfSunday),
            Rule::dated("Chinese New Year", SG_CHINESE_NEW_YEAR, 0)
                .observed(NextFreeWeekdayIfSunday),
            Rule::dated("Chinese New Year (second day)", SG_CHINESE_NEW_YEAR, 1)
                .observed(NextFreeWeekdayIfSunday),
            Rule::easter("Good Friday", -2),
            Rule::dated("Hari Raya Puasa", SG_HARI_RAYA_PUASA, 0).observed(NextFreeWeekdayIfSunday),
            Rule::fixed("Labour Day", 5, 1).observed(NextFreeWeekdayIfSunday),
            Rule::dated("Vesak Day", SG_VESAK_DAY, 0).observed(NextFreeWeekdayIfSunday),
            Rule::dated("Hari Raya Haji", SG_HARI_RAYA_HAJI, 0).observed(NextFreeWeekdayIfSunday),
            Rule::fixed("National Day", 8, 9).observed(NextFreeWeekdayIfSunday),
            Rule::dated("Deepavali", SG_DEEPAVALI, 0).observed(NextFreeWeekdayIfSunday),
            Rule::fixed("Christmas Day", 12, 25).observed(NextFreeWeekdayIfSunday),
        ],
        _ => return None,
    };

    Some(rules)
}

/// Public holidays of `country_code` in `year`.
pub fn holidays_in_year(country_code: &str, year: i32) -> Result<Vec<Holiday>, SourceError> {
    let rules = rules_for(country_code)
        .ok_or_else(|| SourceError::UnsupportedCountry(country_code.to_string()))?;
    if !rules
        .iter()
        .all(|rule| !(rule.applies)(year) || rule.when.covers(year))
    {
        return Err(SourceError::YearNotCovered {
            country_code: country_code.to_string(),
            year,
        });
    }

    // Next year's rules too: a Saturday New Year's Day is observed on Dec 31.
    let mut actual: Vec<(NaiveDate, &Rule)> = Vec::new();
    for y in [year, year + 1] {
        for rule in rules.iter().filter(|rule| (rule.applies)(y)) {
            if let Some(date) = rule.when.resolve(y) {
                actual.push((date, rule));
            }
        }
    }
    actual.sort_by_key(|(date, _)| *date);

    let mut taken: BTreeSet<NaiveDate> = actual.iter().map(|(date, _)| *date).collect();
    let mut holidays = Vec::with_capacity(actual.len());
    let mut push = |date: NaiveDate, name: String| {
        holidays.push(Holiday::new(date, name, country_code));
    };

    for (index, &(date, rule)) in actual.iter().enumerate() {
        // A second holiday on the same date earns a substitute like a weekend
        let overlaps = index > 0 && actual[index - 1].0 == date;
        match rule.observance_in(date.year()) {
            Observance::Actual => push(date, rule.name.to_string()),
            Observance::SaturdayIfSunday => {
                let moved = if date.weekday() == Weekday::Sun {
                    date - Duration::days(1)
                } else {
                    date
                };
                push(moved, rule.name.to_string());
            }
            Observance::NearestWeekday => {
                push(date, rule.name.to_string());
                let observed = match date.weekday() {
                    Weekday::Sat => Some(date - Duration::days(1)),
                    Weekday::Sun => Some(date + Duration::days(1)),
                    _ => None,
                };
                if let Some(observed) = observed {
                    push(observed, format!("{} (observed)", rule.name));
                }
            }
            observance @ (Observance::NextFreeWeekday | Observance::NextFreeWeekdayIfSunday) => {
                push(date, rule.name.to_string());
                let falls_off = match observance {
                    Observance::NextFreeWeekday => is_weekend(date),
                    _ => date.weekday() == Weekday::Sun,
                };
                if falls_off || overlaps {
                    let mut substitute = date + Duration::days(1);
                    while is_weekend(substitute) || taken.contains(&substitute) {
                        substitute = substitute + Duration::days(1);
                    }
                    taken.insert(substitute);
                    push(substitute, format!("{} (substitute day)", rule.name));
                }
            }
        }
    }

    holidays.retain(|holiday| holiday.date.year() == year);
    holidays.sort_by_key(|holiday| holiday.date);
    Ok(holidays)
}

/// Holiday source backed by the built-in rule tables. Fails only for an
/// unsupported country or a year past a date table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticRulesSource;

impl StaticRulesSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HolidaySource for StaticRulesSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn supports(&self, country_code: &str) -> bool {
        SUPPORTED_COUNTRIES.contains(&country_code)
    }

    async fn fetch(&self, country_code: &str, year: i32) -> Result<Vec<Holiday>, SourceError> {
        holidays_in_year(country_code, year)
    }
}
