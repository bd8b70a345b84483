use crate::domain::entities::HolidayCalendar;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Union of several countries' holidays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedHolidays {
    /// Every date that is a holiday in at least one country
    pub exclusion_set: BTreeSet<NaiveDate>,
    /// Contributing (country code, name) pairs per date, in request order
    pub name_index: BTreeMap<NaiveDate, Vec<(String, String)>>,
}

impl AggregatedHolidays {
    pub fn names_on(&self, date: NaiveDate) -> &[(String, String)] {
        self.name_index
            .get(&date)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Merges per-country calendars with union semantics.
///
/// `country_order` is the request's country order; name pairs on a date are
/// sorted by it so the output does not depend on the order calendars arrive
/// in. Countries missing from `country_order` sort last, by code.
pub fn aggregate(country_order: &[String], calendars: &[HolidayCalendar]) -> AggregatedHolidays {
    let rank = |code: &str| {
        country_order
            .iter()
            .position(|c| c == code)
            .unwrap_or(country_order.len())
    };

    let mut aggregated = AggregatedHolidays::default();
    for calendar in calendars {
        for (date, name) in calendar.iter() {
            aggregated.exclusion_set.insert(date);
            aggregated
                .name_index
                .entry(date)
                .or_default()
                .push((calendar.country_code().to_string(), name.to_string()));
        }
    }

    for names in aggregated.name_index.values_mut() {
        names.sort_by(|a, b| rank(&a.0).cmp(&rank(&b.0)).then_with(|| a.0.cmp(&b.0)));
    }

    aggregated
}

/// Display text for a holiday date: the bare name for a single country,
/// otherwise "Name (CC)" entries joined with ", ".
pub fn display_name(names: &[(String, String)]) -> String {
    match names {
        [] => String::new(),
        [(_, name)] => name.clone(),
        many => many
            .iter()
            .map(|(code, name)| format!("{} ({})", name, code))
            .collect::<Vec<_>>()
            .join(", "),
    }
}
