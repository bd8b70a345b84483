use crate::domain::entities::Holiday;
use crate::domain::ports::holiday_source::{HolidaySource, SourceError};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

/// Public holiday calendar ids, by country code.
const CALENDAR_IDS: &[(&str, &str)] = &[
    // Asia
    ("KR", "en.south_korea#holiday@group.v.calendar.google.com"),
    ("JP", "en.japanese#holiday@group.v.calendar.google.com"),
    ("CN", "en.china#holiday@group.v.calendar.google.com"),
    ("HK", "en.hong_kong#holiday@group.v.calendar.google.com"),
    ("TW", "en.taiwan#holiday@group.v.calendar.google.com"),
    ("SG", "en.singapore#holiday@group.v.calendar.google.com"),
    ("MY", "en.malaysia#holiday@group.v.calendar.google.com"),
    ("TH", "en.th#holiday@group.v.calendar.google.com"),
    ("ID", "en.indonesian#holiday@group.v.calendar.google.com"),
    ("PH", "en.philippines#holiday@group.v.calendar.google.com"),
    ("VN", "en.vietnamese#holiday@group.v.calendar.google.com"),
    ("IN", "en.indian#holiday@group.v.calendar.google.com"),
    // Middle East
    ("AE", "en.ae#holiday@group.v.calendar.google.com"),
    ("UAE", "en.ae#holiday@group.v.calendar.google.com"),
    ("SA", "en.saudiarabian#holiday@group.v.calendar.google.com"),
    // Europe
    ("GB", "en.uk#holiday@group.v.calendar.google.com"),
    ("DE", "en.german#holiday@group.v.calendar.google.com"),
    ("FR", "en.french#holiday@group.v.calendar.google.com"),
    ("IT", "en.italian#holiday@group.v.calendar.google.com"),
    ("ES", "en.spanish#holiday@group.v.calendar.google.com"),
    ("NL", "en.dutch#holiday@group.v.calendar.google.com"),
    ("BE", "en.be#holiday@group.v.calendar.google.com"),
    ("GR", "en.greek#holiday@group.v.calendar.google.com"),
    ("NO", "en.norwegian#holiday@group.v.calendar.google.com"),
    ("SE", "en.swedish#holiday@group.v.calendar.google.com"),
    ("DK", "en.danish#holiday@group.v.calendar.google.com"),
    ("FI", "en.finnish#holiday@group.v.calendar.google.com"),
    ("PL", "en.polish#holiday@group.v.calendar.google.com"),
    ("RU", "en.russian#holiday@group.v.calendar.google.com"),
    // Americas
    ("US", "en.usa#holiday@group.v.calendar.google.com"),
    ("CA", "en.canadian#holiday@group.v.calendar.google.com"),
    ("MX", "en.mexican#holiday@group.v.calendar.google.com"),
    ("BR", "en.brazilian#holiday@group.v.calendar.google.com"),
    ("AR", "en.ar#holiday@group.v.calendar.google.com"),
    ("CL", "en.cl#holiday@group.v.calendar.google.com"),
    // Oceania
    ("AU", "en.australian#holiday@group.v.calendar.google.com"),
    ("NZ", "en.new_zealand#holiday@group.v.calendar.google.com"),
    // Africa
    ("ZA", "en.sa#holiday@group.v.calendar.google.com"),
];

pub fn calendar_id(country_code: &str) -> Option<&'static str> {
    CALENDAR_IDS
        .iter()
        .find(|(code, _)| *code == country_code)
        .map(|(_, id)| *id)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarEvent {
    summary: Option<String>,
    description: Option<String>,
    start: Option<EventStart>,
}

#[derive(Debug, Deserialize)]
struct EventStart {
    /// Present for all-day events only
    date: Option<String>,
}

impl CalendarEvent {
    /// All-day events described as a public holiday; observances are skipped.
    fn public_holiday_date(&self) -> Option<NaiveDate> {
        let description = self.description.as_deref().unwrap_or_default();
        if !description.to_ascii_lowercase().contains("public holiday") {
            return None;
        }
        let date = self.start.as_ref()?.date.as_deref()?;
        NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
    }
}

/// Holiday source backed by Google Calendar's public holiday calendars.
pub struct GoogleCalendarSource {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleCalendarSource {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        let encoded = calendar_id.replace('#', "%23").replace('@', "%40");
        format!("{}/calendars/{}/events", self.base_url, encoded)
    }

    async fn fetch_page(
        &self,
        url: &str,
        year: i32,
        page_token: Option<&str>,
    ) -> Result<EventsPage, SourceError> {
        let time_min = format!("{:04}-01-01T00:00:00Z", year);
        let time_max = format!("{:04}-01-01T00:00:00Z", year + 1);
        let mut query = vec![
            ("key", self.api_key.as_str()),
            ("timeMin", time_min.as_str()),
            ("timeMax", time_max.as_str()),
            ("singleEvents", "true"),
            ("orderBy", "startTime"),
            ("maxResults", "250"),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http_client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Request(format!("Connection timeout: {}", e))
                } else if e.is_connect() {
                    SourceError::Request(format!("Connection failed: {}", e))
                } else {
                    SourceError::Request(format!("Network error: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(500).collect();
            return Err(SourceError::Request(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        response
            .json::<EventsPage>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl HolidaySource for GoogleCalendarSource {
    fn name(&self) -> &'static str {
        "google_calendar"
    }

    fn supports(&self, country_code: &str) -> bool {
        calendar_id(country_code).is_some()
    }

    async fn fetch(&self, country_code: &str, year: i32) -> Result<Vec<Holiday>, SourceError> {
        let calendar_id = calendar_id(country_code)
            .ok_or_else(|| SourceError::UnsupportedCountry(country_code.to_string()))?;
        let url = self.events_url(calendar_id);

        let mut holidays = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.fetch_page(&url, year, page_token.as_deref()).await?;
            holidays.extend(page.items.iter().filter_map(|event| {
                let date = event.public_holiday_date()?;
                let name = event.summary.clone().unwrap_or_else(|| "Holiday".to_string());
                Some(Holiday::new(date, name, country_code))
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        holidays.retain(|holiday| holiday.date.year() == year);
        holidays.sort_by_key(|holiday| holiday.date);
        debug!(
            "Google Calendar returned {} public holidays for {} {}",
            holidays.len(),
            country_code,
            year
        );
        Ok(holidays)
    }
}
