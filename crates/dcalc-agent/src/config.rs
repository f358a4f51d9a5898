//! Worker pool settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AgentError;

/// How many workers run and how they pace themselves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Number of concurrent workers (`COMPUTING_POWER`).
    pub computing_power: usize,
    /// Sleep after an empty poll, in milliseconds (`AGENT_POLL_INTERVAL_MS`).
    pub poll_interval_ms: u64,
    /// Sleep after a transport error, in milliseconds (`AGENT_ERROR_BACKOFF_MS`).
    pub error_backoff_ms: u64,
    /// Honour each task's simulated duration before computing it.
    pub simulate_latency: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            computing_power: 3,
            poll_interval_ms: 50,
            error_backoff_ms: 1000,
            simulate_latency: true,
        }
    }
}

impl AgentConfig {
    /// Reads settings from the environment, defaulting anything unset.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str, default: u64| -> Result<u64, AgentError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|_| AgentError::Config {
                    message: format!("{key} must be a non-negative integer, got {raw:?}"),
                }),
            }
        };
        let config = Self {
            computing_power: read("COMPUTING_POWER", defaults.computing_power as u64)? as usize,
            poll_interval_ms: read("AGENT_POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
            error_backoff_ms: read("AGENT_ERROR_BACKOFF_MS", defaults.error_backoff_ms)?,
            simulate_latency: defaults.simulate_latency,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks semantic constraints.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.computing_power == 0 {
            return Err(AgentError::Config {
                message: "computing_power must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Sets the worker count.
    pub fn with_computing_power(mut self, workers: usize) -> Self {
        self.computing_power = workers;
        self
    }

    /// Sets the empty-poll sleep.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Enables or disables the simulated per-task latency.
    pub fn with_simulated_latency(mut self, enabled: bool) -> Self {
        self.simulate_latency = enabled;
        self
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub(crate) fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}
