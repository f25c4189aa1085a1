//! Configuration module for the uptime clock.
//!
//! Loads configuration from environment variables with fixed defaults.

use std::env;
use std::time::Duration;

/// Default endpoint reporting the monitored service's uptime in seconds.
pub const DEFAULT_UPTIME_URL: &str = "https://rng.dev.anymaplay.com/uptime";

/// Default poll interval (one minute).
pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_millis(60_000);

/// Upper bound on a single uptime request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Clock configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Uptime endpoint (default: `DEFAULT_UPTIME_URL`)
    pub uptime_url: String,
    /// Time between fetch cycles (default: 60000 ms)
    pub fetch_interval: Duration,
    /// Per-request timeout, not configurable
    pub request_timeout: Duration,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            uptime_url: DEFAULT_UPTIME_URL.to_string(),
            fetch_interval: DEFAULT_FETCH_INTERVAL,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl ClockConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPTIME_CLOCK_URL`: uptime endpoint
    /// - `UPTIME_CLOCK_FETCH_INTERVAL_MS`: poll interval in milliseconds, must be non-zero
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(url) = lookup("UPTIME_CLOCK_URL") {
            let url = url.trim();
            if url.is_empty() {
                tracing::warn!("Ignoring empty UPTIME_CLOCK_URL");
            } else {
                cfg.uptime_url = url.to_string();
            }
        }

        if let Some(ms_str) = lookup("UPTIME_CLOCK_FETCH_INTERVAL_MS") {
            match ms_str.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => cfg.fetch_interval = Duration::from_millis(ms),
                _ => tracing::warn!(
                    "Ignoring invalid UPTIME_CLOCK_FETCH_INTERVAL_MS: {:?}",
                    ms_str
                ),
            }
        }

        cfg
    }
}
