// ⚙️ Configuration - environment variables with working defaults

use crate::catalog::DEFAULT_REVALIDATE_SECS;
use crate::source::{FeedSource, FetchError, FileFeedSource, HttpFeedSource, DEFAULT_FEED_URL, DEFAULT_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_FEED_URL: &str = "CARD_RADAR_FEED_URL";
pub const ENV_FEED_FILE: &str = "CARD_RADAR_FEED_FILE";
pub const ENV_TIMEOUT_SECS: &str = "CARD_RADAR_TIMEOUT_SECS";
pub const ENV_REVALIDATE_SECS: &str = "CARD_RADAR_REVALIDATE_SECS";
pub const ENV_DB: &str = "CARD_RADAR_DB";
pub const ENV_BIND: &str = "CARD_RADAR_BIND";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds between 1 and {max}, got {value:?}", max = MAX_SECONDS)]
    InvalidSeconds { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub feed_url: String,
    /// Read the feed from this file instead of HTTP
    pub feed_file: Option<PathBuf>,
    pub timeout: Duration,
    pub revalidate_after: chrono::Duration,
    pub db_path: PathBuf,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            feed_url: DEFAULT_FEED_URL.to_string(),
            feed_file: None,
            timeout: DEFAULT_TIMEOUT,
            revalidate_after: chrono::Duration::seconds(DEFAULT_REVALIDATE_SECS),
            db_path: PathBuf::from("card_radar.db"),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let timeout = match get(ENV_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_seconds(ENV_TIMEOUT_SECS, &raw)?),
            None => defaults.timeout,
        };

        let revalidate_after = match get(ENV_REVALIDATE_SECS) {
            Some(raw) => chrono::Duration::seconds(parse_seconds(ENV_REVALIDATE_SECS, &raw)? as i64),
            None => defaults.revalidate_after,
        };

        Ok(Config {
            feed_url: get(ENV_FEED_URL).unwrap_or(defaults.feed_url),
            feed_file: get(ENV_FEED_FILE).map(PathBuf::from),
            timeout,
            revalidate_after,
            db_path: get(ENV_DB).map(PathBuf::from).unwrap_or(defaults.db_path),
            bind_addr: get(ENV_BIND).unwrap_or(defaults.bind_addr),
        })
    }

    /// The configured feed: local file when set, HTTP otherwise
    pub fn feed_source(&self) -> Result<Box<dyn FeedSource>, FetchError> {
        match &self.feed_file {
            Some(path) => Ok(Box::new(FileFeedSource::new(path))),
            None => Ok(Box::new(HttpFeedSource::new(&self.feed_url, self.timeout)?)),
        }
    }
}

/// Upper bound for any configured interval: ten years
pub const MAX_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

fn parse_seconds(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 && secs <= MAX_SECONDS => Ok(secs),
        _ => Err(ConfigError::InvalidSeconds {
            var,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.revalidate_after, chrono::Duration::hours(1));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (ENV_FEED_URL, "https://example.test/cards.csv"),
            (ENV_FEED_FILE, "/tmp/cards.csv"),
            (ENV_TIMEOUT_SECS, "2"),
            (ENV_REVALIDATE_SECS, "600"),
            (ENV_DB, "/var/lib/radar.db"),
            (ENV_BIND, "127.0.0.1:8080"),
        ]))
        .unwrap();

        assert_eq!(config.feed_url, "https://example.test/cards.csv");
        assert_eq!(config.feed_file, Some(PathBuf::from("/tmp/cards.csv")));
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert_eq!(config.revalidate_after, chrono::Duration::minutes(10));
        assert_eq!(config.db_path, PathBuf::from("/var/lib/radar.db"));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[(ENV_FEED_URL, "  "), (ENV_TIMEOUT_SECS, "")])).unwrap();
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_invalid_seconds_are_rejected() {
        for bad in ["0", "-5", "soon", "1.5"] {
            let err = Config::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, bad)])).unwrap_err();
            assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
        }
    }

    #[test]
    fn test_huge_revalidate_window_is_rejected() {
        let err = Config::from_lookup(lookup(&[(ENV_REVALIDATE_SECS, "100000000000000")])).unwrap_err();
        assert!(err.to_string().contains(ENV_REVALIDATE_SECS));

        let edge = MAX_SECONDS.to_string();
        let config = Config::from_lookup(lookup(&[(ENV_REVALIDATE_SECS, edge.as_str())])).unwrap();
        assert_eq!(config.revalidate_after, chrono::Duration::days(3650));
    }

    #[test]
    fn test_feed_file_selects_file_source() {
        let config = Config {
            feed_file: Some(PathBuf::from("cards.csv")),
            ..Config::default()
        };
        let source = config.feed_source().unwrap();
        assert_eq!(source.describe(), "cards.csv");
    }
}
