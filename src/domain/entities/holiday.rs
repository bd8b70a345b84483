use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A public holiday observed in one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    pub country_code: String,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
            country_code: country_code.into(),
        }
    }
}

/// Holidays of a single country over a bounded range of years, ordered by date.
///
/// A date carries one display name. When a source reports two events on the
/// same day their names are joined with " / ".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    country_code: String,
    holidays: BTreeMap<NaiveDate, String>,
}

impl HolidayCalendar {
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            holidays: BTreeMap::new(),
        }
    }

    pub fn from_holidays(
        country_code: impl Into<String>,
        holidays: impl IntoIterator<Item = Holiday>,
    ) -> Self {
        let mut calendar = Self::new(country_code);
        calendar.extend(holidays);
        calendar
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn insert(&mut self, holiday: Holiday) {
        match self.holidays.get_mut(&holiday.date) {
            Some(existing) if existing.as_str() != holiday.name => {
                existing.push_str(" / ");
                existing.push_str(&holiday.name);
            }
            Some(_) => {}
            None => {
                self.holidays.insert(holiday.date, holiday.name);
            }
        }
    }

    pub fn extend(&mut self, holidays: impl IntoIterator<Item = Holiday>) {
        for holiday in holidays {
            self.insert(holiday);
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.holidays.contains_key(&date)
    }

    pub fn name_of(&self, date: NaiveDate) -> Option<&str> {
        self.holidays.get(&date).map(String::as_str)
    }

    /// Dates and names in increasing date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &str)> + '_ {
        self.holidays.iter().map(|(date, name)| (*date, name.as_str()))
    }

    pub fn in_year(&self, year: i32) -> impl Iterator<Item = (NaiveDate, &str)> + '_ {
        self.iter().filter(move |(date, _)| date.year() == year)
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}
