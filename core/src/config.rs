//! Store configuration.
//!
//! Reads `CITIES_API_URL` and `CITIES_API_TIMEOUT_MS` from the environment;
//! anything missing falls back to the defaults.

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3600";

pub const BASE_URL_ENV: &str = "CITIES_API_URL";
pub const TIMEOUT_ENV: &str = "CITIES_API_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Origin the `/cities` resource hangs off.
    pub base_url: String,
    /// Whole-request timeout. `None` leaves it to the transport's defaults.
    pub timeout: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl StoreConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match lookup(BASE_URL_ENV) {
            Some(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        };
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.timeout = Some(Duration::from_millis(ms)),
                Err(_) => warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        config
    }
}
