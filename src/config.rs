use crate::application::services::DEFAULT_MAX_LOOKAHEAD_DAYS;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which holiday data source backs the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HolidaySourceKind {
    Static,
    GoogleCalendar,
}

impl FromStr for HolidaySourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(HolidaySourceKind::Static),
            "google" | "google_calendar" => Ok(HolidaySourceKind::GoogleCalendar),
            other => Err(ConfigError::InvalidHolidaySource(other.to_string())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app_name: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_prefix: String,
    pub holiday_source: HolidaySourceKind,
    pub google_cal_api_key: Option<String>,
    pub holiday_cache_ttl: Duration,
    pub holiday_cache_capacity: usize,
    pub holiday_fetch_max_attempts: u32,
    pub holiday_fetch_backoff: Duration,
    pub holiday_fetch_timeout: Duration,
    pub max_lookahead_days: i64,
    pub request_timeout: Duration,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "DDD Calculator API".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 8000,
            api_prefix: "/api/v1".to_string(),
            holiday_source: HolidaySourceKind::Static,
            google_cal_api_key: None,
            holiday_cache_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            holiday_cache_capacity: 512,
            holiday_fetch_max_attempts: 3,
            holiday_fetch_backoff: Duration::from_millis(200),
            holiday_fetch_timeout: Duration::from_secs(10),
            max_lookahead_days: DEFAULT_MAX_LOOKAHEAD_DAYS,
            request_timeout: Duration::from_secs(30),
            otel_exporter_endpoint: None,
            service_name: "ddd-calculator".to_string(),
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let google_cal_api_key = env::var("GOOGLE_CAL_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        // Google is used whenever a key is configured, unless told otherwise.
        let holiday_source = match env::var("HOLIDAY_SOURCE") {
            Ok(value) => value.parse()?,
            Err(_) if google_cal_api_key.is_some() => HolidaySourceKind::GoogleCalendar,
            Err(_) => HolidaySourceKind::Static,
        };
        if holiday_source == HolidaySourceKind::GoogleCalendar && google_cal_api_key.is_none() {
            return Err(ConfigError::MissingGoogleApiKey);
        }

        Ok(Config {
            app_name: env::var("APP_NAME").unwrap_or(defaults.app_name),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
            api_prefix: env::var("API_PREFIX").unwrap_or(defaults.api_prefix),
            holiday_source,
            google_cal_api_key,
            holiday_cache_ttl: Duration::from_secs(parse_var(
                "HOLIDAY_CACHE_TTL_SECS",
                defaults.holiday_cache_ttl.as_secs(),
            )?),
            holiday_cache_capacity: parse_var(
                "HOLIDAY_CACHE_CAPACITY",
                defaults.holiday_cache_capacity,
            )?,
            holiday_fetch_max_attempts: parse_var(
                "HOLIDAY_FETCH_MAX_ATTEMPTS",
                defaults.holiday_fetch_max_attempts,
            )?,
            holiday_fetch_backoff: Duration::from_millis(parse_var(
                "HOLIDAY_FETCH_BACKOFF_MS",
                defaults.holiday_fetch_backoff.as_millis() as u64,
            )?),
            holiday_fetch_timeout: Duration::from_secs(parse_var(
                "HOLIDAY_FETCH_TIMEOUT_SECS",
                defaults.holiday_fetch_timeout.as_secs(),
            )?),
            max_lookahead_days: parse_var("MAX_LOOKAHEAD_DAYS", defaults.max_lookahead_days)?,
            request_timeout: Duration::from_secs(parse_var(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            metrics_port: match env::var("METRICS_PORT") {
                Ok(port) => Some(port.parse().map_err(|_| ConfigError::Invalid {
                    name: "METRICS_PORT",
                    value: port,
                })?),
                Err(_) => None,
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("Unknown holiday source '{0}', expected 'static' or 'google'")]
    InvalidHolidaySource(String),

    #[error("GOOGLE_CAL_API_KEY must be set to use the Google Calendar holiday source")]
    MissingGoogleApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holiday_source_kind_parsing() {
        assert_eq!("static".parse::<HolidaySourceKind>().unwrap(), HolidaySourceKind::Static);
        assert_eq!(
            " Google ".parse::<HolidaySourceKind>().unwrap(),
            HolidaySourceKind::GoogleCalendar
        );
        assert_eq!(
            "google_calendar".parse::<HolidaySourceKind>().unwrap(),
            HolidaySourceKind::GoogleCalendar
        );
        assert!("nager".parse::<HolidaySourceKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server_address(), "127.0.0.1:8000");
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.holiday_source, HolidaySourceKind::Static);
        assert_eq!(config.holiday_cache_ttl, Duration::from_secs(604_800));
        assert_eq!(config.max_lookahead_days, DEFAULT_MAX_LOOKAHEAD_DAYS);
    }
}
