//! Tunables for drivers and chains

use crate::errors::AutomationError;
use crate::input::KeyCombination;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

const ENV_POLL_INTERVAL_MS: &str = "QUERYCHAIN_POLL_INTERVAL_MS";
const ENV_DRAIN_ATTEMPTS: &str = "QUERYCHAIN_DRAIN_ATTEMPTS";
const ENV_DRAIN_PAUSE_MS: &str = "QUERYCHAIN_DRAIN_PAUSE_MS";
const ENV_CLOSE_WINDOW_SETTLE_MS: &str = "QUERYCHAIN_CLOSE_WINDOW_SETTLE_MS";
const ENV_SETTLE_AFTER_INPUT: &str = "QUERYCHAIN_SETTLE_AFTER_INPUT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Delay between two checks of a wait condition
    pub poll_interval_ms: u64,
    /// Rounds of UI event draining after an `interact`
    pub drain_attempts: u32,
    /// Pause after each drain round
    pub drain_pause_ms: u64,
    /// Fixed delay after the window-close shortcut. Not condition based: it only
    /// gives a close animation time to run and promises nothing about the window.
    pub close_window_settle_ms: u64,
    /// Drain one round of UI events after each robot primitive
    pub settle_after_input: bool,
    pub close_window_combination: KeyCombination,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            drain_attempts: 5,
            drain_pause_ms: 10,
            close_window_settle_ms: 100,
            settle_after_input: true,
            close_window_combination: KeyCombination::close_window(),
        }
    }
}

impl ChainConfig {
    pub fn from_json(json: &str) -> Result<Self, AutomationError> {
        serde_json::from_str(json)
            .map_err(|e| AutomationError::InvalidArgument(format!("Invalid chain config: {e}")))
    }

    /// Defaults overridden by any `QUERYCHAIN_*` variables present in the environment.
    pub fn from_env() -> Result<Self, AutomationError> {
        let mut config = Self::default();
        if let Some(v) = env_var(ENV_POLL_INTERVAL_MS)? {
            config.poll_interval_ms = v;
        }
        if let Some(v) = env_var(ENV_DRAIN_ATTEMPTS)? {
            config.drain_attempts = v;
        }
        if let Some(v) = env_var(ENV_DRAIN_PAUSE_MS)? {
            config.drain_pause_ms = v;
        }
        if let Some(v) = env_var(ENV_CLOSE_WINDOW_SETTLE_MS)? {
            config.close_window_settle_ms = v;
        }
        if let Some(v) = env_var(ENV_SETTLE_AFTER_INPUT)? {
            config.settle_after_input = v;
        }
        Ok(config)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_drain_attempts(mut self, attempts: u32) -> Self {
        self.drain_attempts = attempts;
        self
    }

    pub fn with_close_window_settle(mut self, settle: Duration) -> Self {
        self.close_window_settle_ms = u64::try_from(settle.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_settle_after_input(mut self, settle: bool) -> Self {
        self.settle_after_input = settle;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn drain_pause(&self) -> Duration {
        Duration::from_millis(self.drain_pause_ms)
    }

    pub fn close_window_settle(&self) -> Duration {
        Duration::from_millis(self.close_window_settle_ms)
    }
}

fn env_var<T: FromStr>(name: &str) -> Result<Option<T>, AutomationError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            AutomationError::InvalidArgument(format!(
                "Environment variable {name} has invalid value '{raw}'"
            ))
        }),
        Err(_) => Ok(None),
    }
}
