use crate::domain::{CategoryBounds, Decimal};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub rates_api_url: String,
    /// Currency category bounds are expressed in.
    pub base_currency: String,
    pub category_bounds: CategoryBounds,
    /// TTL for cached leaderboard pages, in seconds.
    pub cache_ttl_secs: u64,
    /// Fixed UTC offset of the reference timezone used for date bucketing.
    pub tz_offset_hours: i32,
    pub contest_start: DateTime<Utc>,
    pub contest_end: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let rates_api_url = env_map
            .get("RATES_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RATES_API_URL".to_string()))?;

        let base_currency = env_map
            .get("BASE_CURRENCY")
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "RUB".to_string());

        let lower = parse_decimal(&env_map, "CATEGORY_LOWER_BOUND", "70000")?;
        let upper = parse_decimal(&env_map, "CATEGORY_UPPER_BOUND", "250000")?;
        let category_bounds = CategoryBounds::new(lower, upper)
            .map_err(|e| ConfigError::InvalidValue("CATEGORY_UPPER_BOUND".to_string(), e))?;

        let cache_ttl_secs = env_map
            .get("CACHE_TTL_SECS")
            .map(|s| s.as_str())
            .unwrap_or("60")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "CACHE_TTL_SECS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let tz_offset_hours = env_map
            .get("TZ_OFFSET_HOURS")
            .map(|s| s.as_str())
            .unwrap_or("3")
            .parse::<i32>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "TZ_OFFSET_HOURS".to_string(),
                    "must be a valid i32".to_string(),
                )
            })?;
        if !(-12..=14).contains(&tz_offset_hours) {
            return Err(ConfigError::InvalidValue(
                "TZ_OFFSET_HOURS".to_string(),
                format!("must be within -12..=14, got {}", tz_offset_hours),
            ));
        }

        let contest_start = parse_timestamp(&env_map, "CONTEST_START")?;
        let contest_end = parse_timestamp(&env_map, "CONTEST_END")?;
        if contest_start >= contest_end {
            return Err(ConfigError::InvalidValue(
                "CONTEST_END".to_string(),
                "must be after CONTEST_START".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            rates_api_url,
            base_currency,
            category_bounds,
            cache_ttl_secs,
            tz_offset_hours,
            contest_start,
            contest_end,
        })
    }

    /// True if `at` falls within the contest window (inclusive bounds).
    pub fn contest_open_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.contest_start && at <= self.contest_end
    }

    /// The as-of date used for ranking: today in the reference timezone,
    /// clamped to the contest's final date once the contest is over.
    pub fn as_of_date(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = crate::domain::reference_date(now, self.tz_offset_hours);
        let final_date = crate::domain::reference_date(self.contest_end, self.tz_offset_hours);
        today.min(final_date)
    }
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    Decimal::from_str_canonical(env_map.get(key).map(|s| s.as_str()).unwrap_or(default)).map_err(
        |_| ConfigError::InvalidValue(key.to_string(), "must be a valid decimal".to_string()),
    )
}

fn parse_timestamp(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<DateTime<Utc>, ConfigError> {
    let raw = env_map
        .get(key)
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be an RFC 3339 timestamp".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert(
            "RATES_API_URL".to_string(),
            "https://rates.example/daily.json".to_string(),
        );
        map.insert(
            "CONTEST_START".to_string(),
            "2025-06-01T00:00:00+03:00".to_string(),
        );
        map.insert(
            "CONTEST_END".to_string(),
            "2025-09-01T00:00:00+03:00".to_string(),
        );
        map
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_rates_api_url() {
        let mut env_map = setup_required_env();
        env_map.remove("RATES_API_URL");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "RATES_API_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_contest_window() {
        let mut env_map = setup_required_env();
        env_map.remove("CONTEST_END");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "CONTEST_END"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_inverted_category_bounds_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("CATEGORY_LOWER_BOUND".to_string(), "500000".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CATEGORY_UPPER_BOUND"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_inverted_contest_window_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "CONTEST_START".to_string(),
            "2025-10-01T00:00:00Z".to_string(),
        );
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CONTEST_END"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.base_currency, "RUB");
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.tz_offset_hours, 3);
        assert_eq!(
            config.category_bounds.lower.to_canonical_string(),
            "70000"
        );
    }

    #[test]
    fn test_contest_open_at_bounds() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert!(config.contest_open_at(config.contest_start));
        assert!(config.contest_open_at(config.contest_end));
        assert!(!config.contest_open_at(config.contest_end + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_as_of_date_clamped_to_contest_end() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        let after_end = Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap();
        assert_eq!(
            config.as_of_date(after_end),
            NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()
        );
        let during = Utc.with_ymd_and_hms(2025, 7, 10, 12, 0, 0).unwrap();
        assert_eq!(
            config.as_of_date(during),
            NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()
        );
    }
}
