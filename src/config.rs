/*!
 * Guard Configuration
 *
 * Logging and observability settings for guards and the tour binary.
 */

use crate::core::guard::set_slow_release_threshold;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Guard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Filter used when RUST_LOG is unset (default: info)
    pub log_filter: String,

    /// Emit JSON log lines instead of compact text
    pub json_logs: bool,

    /// Events kept by a collector before the oldest are evicted
    pub event_capacity: usize,

    /// Releases slower than this are logged as warnings, 0 = off
    pub slow_release_ms: u64,
}

impl GuardConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            log_filter: "info".to_string(),
            json_logs: false,
            event_capacity: 1024,
            slow_release_ms: 100,
        }
    }

    /// Warnings only, no slow-release reporting (testing)
    pub fn quiet() -> Self {
        Self {
            log_filter: "warn".to_string(),
            slow_release_ms: 0,
            ..Self::new()
        }
    }

    /// Full lifecycle logging for walking through the tour
    pub fn verbose() -> Self {
        Self {
            log_filter: "debug".to_string(),
            event_capacity: 4096,
            slow_release_ms: 10,
            ..Self::new()
        }
    }

    /// Load from environment variables on top of the defaults
    ///
    /// - SCOPED_GUARD_LOG: log filter
    /// - SCOPED_GUARD_TRACE_JSON: "1"/"true" for JSON output
    /// - SCOPED_GUARD_EVENT_CAPACITY: collector capacity
    /// - SCOPED_GUARD_SLOW_RELEASE_MS: slow release threshold
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(filter) = lookup("SCOPED_GUARD_LOG") {
            config.log_filter = filter;
        }
        if let Some(json) = lookup("SCOPED_GUARD_TRACE_JSON") {
            config.json_logs = json == "1" || json.eq_ignore_ascii_case("true");
        }
        if let Some(capacity) = lookup("SCOPED_GUARD_EVENT_CAPACITY") {
            config.event_capacity = capacity.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "SCOPED_GUARD_EVENT_CAPACITY",
                value: capacity.clone(),
            })?;
        }
        if let Some(slow) = lookup("SCOPED_GUARD_SLOW_RELEASE_MS") {
            config.slow_release_ms = slow.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "SCOPED_GUARD_SLOW_RELEASE_MS",
                value: slow.clone(),
            })?;
        }

        Ok(config)
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn slow_release(&self) -> Option<Duration> {
        match self.slow_release_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Apply process-wide settings (slow release threshold)
    pub fn install(&self) {
        set_slow_release_threshold(self.slow_release());
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::new()
    }
}
