use crate::domain::errors::{CalculationError, DomainResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of payment term used to derive the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TermKind {
    /// Delivery date plus a count of business days
    Ddd,
    /// Cash on delivery
    Cod,
    /// Cash in advance
    Cia,
}

impl TermKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermKind::Ddd => "DDD",
            TermKind::Cod => "COD",
            TermKind::Cia => "CIA",
        }
    }

    /// Counting plan fed to the date engine, or `None` when the term is due on
    /// the delivery date itself.
    pub fn counting_plan(
        &self,
        delivery_date: NaiveDate,
        days: Option<i64>,
        include_delivery_as_day_one: bool,
    ) -> DomainResult<Option<CountingPlan>> {
        match self {
            TermKind::Ddd => {
                let days = days.ok_or_else(|| {
                    CalculationError::validation("DDD term requires 'days'")
                })?;
                if days < 1 {
                    return Err(CalculationError::InvalidTarget(days));
                }
                Ok(Some(CountingPlan {
                    start: delivery_date,
                    target: days,
                    include_start: include_delivery_as_day_one,
                }))
            }
            TermKind::Cod | TermKind::Cia => Ok(None),
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermKind {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DDD" => Ok(TermKind::Ddd),
            "COD" => Ok(TermKind::Cod),
            "CIA" => Ok(TermKind::Cia),
            other => Err(CalculationError::validation(format!(
                "Unsupported payment term kind: {}",
                other
            ))),
        }
    }
}

/// Inputs of one run of the counting loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountingPlan {
    pub start: NaiveDate,
    pub target: i64,
    pub include_start: bool,
}

impl CountingPlan {
    /// First date the counting loop looks at, or `None` past the last
    /// representable date.
    pub fn first_day(&self) -> Option<NaiveDate> {
        if self.include_start {
            Some(self.start)
        } else {
            self.start.succ_opt()
        }
    }
}

/// Why a date was skipped by the counting loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExclusionReason {
    Weekend,
    Holiday,
}

/// A skipped date. `holiday_names` holds (country code, name) pairs in request
/// country order and stays empty for weekends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionEntry {
    pub date: NaiveDate,
    pub reason: ExclusionReason,
    pub holiday_names: Vec<(String, String)>,
}

impl ExclusionEntry {
    pub fn new(date: NaiveDate, reason: ExclusionReason) -> Self {
        Self {
            date,
            reason,
            holiday_names: Vec::new(),
        }
    }
}

/// Request body accepted on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    pub delivery_date: String,
    #[serde(default)]
    pub country_codes: Vec<String>,
    pub term_kind: String,
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default = "default_true")]
    pub skip_weekends: bool,
    #[serde(default = "default_true")]
    pub skip_holidays: bool,
    #[serde(default)]
    pub include_delivery_as_day_one: bool,
    #[serde(default)]
    pub adjust_to_weekday: bool,
}

fn default_true() -> bool {
    true
}

/// A structurally valid calculation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationRequest {
    pub delivery_date: NaiveDate,
    pub country_codes: Vec<String>,
    pub term_kind: TermKind,
    pub days: Option<i64>,
    pub skip_weekends: bool,
    pub skip_holidays: bool,
    pub include_delivery_as_day_one: bool,
    pub adjust_to_weekday: bool,
}

impl CalculationRequest {
    /// Creates a DDD request with weekend and holiday skipping enabled.
    pub fn ddd(delivery_date: NaiveDate, country_codes: &[&str], days: i64) -> Self {
        Self {
            delivery_date,
            country_codes: country_codes.iter().map(|c| c.to_string()).collect(),
            term_kind: TermKind::Ddd,
            days: Some(days),
            skip_weekends: true,
            skip_holidays: true,
            include_delivery_as_day_one: false,
            adjust_to_weekday: false,
        }
    }

    /// Checks the structural invariants and normalizes country codes.
    pub fn validate(mut self) -> DomainResult<Self> {
        self.country_codes = normalize_country_codes(&self.country_codes)?;
        // Surfaces missing or non-positive `days` before any work is done.
        self.term_kind
            .counting_plan(self.delivery_date, self.days, self.include_delivery_as_day_one)?;
        Ok(self)
    }

    /// Whether answering needs holiday data at all.
    pub fn needs_holiday_data(&self) -> bool {
        self.term_kind == TermKind::Ddd && (self.skip_holidays || self.adjust_to_weekday)
    }

    pub fn counting_plan(&self) -> DomainResult<Option<CountingPlan>> {
        self.term_kind
            .counting_plan(self.delivery_date, self.days, self.include_delivery_as_day_one)
    }
}

impl TryFrom<CalculateRequest> for CalculationRequest {
    type Error = CalculationError;

    fn try_from(body: CalculateRequest) -> Result<Self, Self::Error> {
        let delivery_date = NaiveDate::parse_from_str(body.delivery_date.trim(), "%Y-%m-%d")
            .map_err(|_| {
                CalculationError::validation(format!(
                    "Invalid delivery_date '{}', expected YYYY-MM-DD",
                    body.delivery_date
                ))
            })?;
        let term_kind = body.term_kind.parse::<TermKind>()?;

        CalculationRequest {
            delivery_date,
            country_codes: body.country_codes,
            term_kind,
            days: body.days,
            skip_weekends: body.skip_weekends,
            skip_holidays: body.skip_holidays,
            include_delivery_as_day_one: body.include_delivery_as_day_one,
            adjust_to_weekday: body.adjust_to_weekday,
        }
        .validate()
    }
}

/// Trims, upper-cases and de-duplicates country codes, keeping first
/// occurrence order.
pub fn normalize_country_codes(codes: &[String]) -> DomainResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(codes.len());
    for raw in codes {
        let code = raw.trim().to_ascii_uppercase();
        let well_formed =
            (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphabetic());
        if !well_formed {
            return Err(CalculationError::validation(format!(
                "Invalid country code '{}'",
                raw
            )));
        }
        if !normalized.contains(&code) {
            normalized.push(code);
        }
    }

    if normalized.is_empty() {
        return Err(CalculationError::validation(
            "At least one country code is required",
        ));
    }

    Ok(normalized)
}

/// Outcome of a calculation, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculationResult {
    pub delivery_date: NaiveDate,
    pub due_date: NaiveDate,
    pub days: Option<i64>,
    pub country_codes: Vec<String>,
    pub term_kind: TermKind,
    pub excluded_weekends: Vec<NaiveDate>,
    pub excluded_holidays: Vec<NaiveDate>,
    pub holiday_names: BTreeMap<NaiveDate, String>,
    pub holiday_names_by_country: BTreeMap<NaiveDate, BTreeMap<String, String>>,
    pub holidays_excluded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_term_kind_parsing() {
        assert_eq!(" ddd ".parse::<TermKind>(), Ok(TermKind::Ddd));
        assert_eq!("Cod".parse::<TermKind>(), Ok(TermKind::Cod));
        assert_eq!("CIA".parse::<TermKind>(), Ok(TermKind::Cia));
        assert!("NET30".parse::<TermKind>().is_err());
    }

    #[test]
    fn test_request_body_defaults() {
        let body: CalculateRequest = serde_json::from_str(
            r#"{"delivery_date": "2024-03-01", "country_codes": ["us"], "term_kind": "DDD", "days": 5}"#,
        )
        .unwrap();
        assert!(body.skip_weekends);
        assert!(body.skip_holidays);
        assert!(!body.include_delivery_as_day_one);
        assert!(!body.adjust_to_weekday);

        let request = CalculationRequest::try_from(body).unwrap();
        assert_eq!(request.delivery_date, date(2024, 3, 1));
        assert_eq!(request.country_codes, vec!["US".to_string()]);
        assert_eq!(request.term_kind, TermKind::Ddd);
    }

    #[test]
    fn test_invalid_delivery_date() {
        let body: CalculateRequest = serde_json::from_str(
            r#"{"delivery_date": "2024-02-30", "country_codes": ["US"], "term_kind": "COD"}"#,
        )
        .unwrap();
        let err = CalculationRequest::try_from(body).unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[test]
    fn test_country_code_normalization() {
        let codes = vec![" de".to_string(), "US".to_string(), "de".to_string()];
        assert_eq!(
            normalize_country_codes(&codes).unwrap(),
            vec!["DE".to_string(), "US".to_string()]
        );
        assert!(normalize_country_codes(&["U".to_string()]).is_err());
        assert!(normalize_country_codes(&["U-S".to_string()]).is_err());
        assert!(normalize_country_codes(&[]).is_err());
    }

    #[test]
    fn test_counting_plan_first_day() {
        let plan = TermKind::Ddd
            .counting_plan(date(2024, 2, 29), Some(3), false)
            .unwrap()
            .unwrap();
        assert_eq!(plan.first_day(), Some(date(2024, 3, 1)));

        let last = TermKind::Ddd
            .counting_plan(NaiveDate::MAX, Some(1), false)
            .unwrap()
            .unwrap();
        assert_eq!(last.first_day(), None);
        assert_eq!(TermKind::Cia.counting_plan(date(2024, 2, 29), None, false), Ok(None));
    }
}
