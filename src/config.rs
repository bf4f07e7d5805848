//! Configuration Module
//!
//! Handles loading and managing dashboard configuration from environment variables.

use std::env;
use std::str::FromStr;

use crate::cache::FetchStrategy;

/// Dashboard configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Directory path or http(s) base URL the static site is served from
    pub origin: String,
    /// Version suffix of the asset cache name
    pub cache_version: String,
    /// Fetch policy applied to intercepted requests
    pub fetch_strategy: FetchStrategy,
    /// Build version the update notifier compares against
    pub app_version: String,
    /// JSON file backing the persistent key-value store
    pub state_file: String,
    /// Weather API key, the weather widget is disabled without one
    pub weather_api_key: Option<String>,
    /// Free-text weather query
    pub weather_location: String,
    /// Weather API language parameter
    pub weather_lang: String,
    /// Weather polling interval in seconds
    pub weather_poll_secs: u64,
    /// Saint polling interval in seconds
    pub saint_poll_secs: u64,
    /// Consecutive failed logins before a lockout
    pub login_max_failures: u32,
    /// Lockout duration in seconds
    pub login_lockout_secs: u64,
    /// Local UTC offset used to compute logical days
    pub utc_offset_minutes: i32,
    /// Coarsest geolocation accuracy accepted, in meters
    pub geo_max_accuracy_m: f64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SUITE_ORIGIN` - Static site origin (default: ./site)
    /// - `CACHE_VERSION` - Asset cache version (default: 2.3.0)
    /// - `FETCH_STRATEGY` - `cache-first` or `stale-while-revalidate` (default: cache-first)
    /// - `APP_VERSION` - Current build version (default: 2.0.0)
    /// - `STATE_FILE` - Persistent store file (default: suite-state.json)
    /// - `WEATHER_API_KEY` - Weather API key (default: unset)
    /// - `WEATHER_LOCATION` - Weather query (default: Jacinto Machado)
    /// - `WEATHER_LANG` - Weather language (default: pt)
    /// - `WEATHER_POLL_SECS` - Weather refresh interval (default: 900)
    /// - `SAINT_POLL_SECS` - Saint refresh interval (default: 60)
    /// - `LOGIN_MAX_FAILURES` - Lockout threshold (default: 3)
    /// - `LOGIN_LOCKOUT_SECS` - Lockout duration (default: 10)
    /// - `UTC_OFFSET_MINUTES` - Local offset (default: -180)
    /// - `GEO_MAX_ACCURACY_M` - Geolocation accuracy threshold (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            origin: env::var("SUITE_ORIGIN").unwrap_or(defaults.origin),
            cache_version: env::var("CACHE_VERSION").unwrap_or(defaults.cache_version),
            fetch_strategy: parse_var("FETCH_STRATEGY").unwrap_or(defaults.fetch_strategy),
            app_version: env::var("APP_VERSION").unwrap_or(defaults.app_version),
            state_file: env::var("STATE_FILE").unwrap_or(defaults.state_file),
            weather_api_key: env::var("WEATHER_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            weather_location: env::var("WEATHER_LOCATION").unwrap_or(defaults.weather_location),
            weather_lang: env::var("WEATHER_LANG").unwrap_or(defaults.weather_lang),
            weather_poll_secs: parse_nonzero("WEATHER_POLL_SECS")
                .unwrap_or(defaults.weather_poll_secs),
            saint_poll_secs: parse_nonzero("SAINT_POLL_SECS").unwrap_or(defaults.saint_poll_secs),
            login_max_failures: parse_var("LOGIN_MAX_FAILURES")
                .unwrap_or(defaults.login_max_failures),
            login_lockout_secs: parse_var("LOGIN_LOCKOUT_SECS")
                .unwrap_or(defaults.login_lockout_secs),
            utc_offset_minutes: parse_var("UTC_OFFSET_MINUTES")
                .unwrap_or(defaults.utc_offset_minutes),
            geo_max_accuracy_m: parse_var("GEO_MAX_ACCURACY_M")
                .unwrap_or(defaults.geo_max_accuracy_m),
        }
    }

    /// Name of the asset cache for the configured version.
    pub fn cache_name(&self) -> String {
        format!("suite-cache-v{}", self.cache_version)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Intervals of zero are ignored so the default applies.
fn parse_nonzero(name: &str) -> Option<u64> {
    parse_var(name).filter(|&secs: &u64| secs > 0)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            origin: "./site".to_string(),
            cache_version: "2.3.0".to_string(),
            fetch_strategy: FetchStrategy::CacheFirst,
            app_version: "2.0.0".to_string(),
            state_file: "suite-state.json".to_string(),
            weather_api_key: None,
            weather_location: "Jacinto Machado".to_string(),
            weather_lang: "pt".to_string(),
            weather_poll_secs: 900,
            saint_poll_secs: 60,
            login_max_failures: 3,
            login_lockout_secs: 10,
            utc_offset_minutes: -180,
            geo_max_accuracy_m: 1000.0,
        }
    }
}
