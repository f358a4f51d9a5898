//! Orchestrator configuration.
//!
//! Settings come from a TOML file, from environment variables, or from
//! [`CalcConfig::default`].
//!
//! # Example TOML
//!
//! ```toml
//! queue_capacity = 100
//! result_timeout_ms = 30000
//!
//! [operation_times]
//! addition_ms = 100
//! subtraction_ms = 100
//! multiplication_ms = 200
//! division_ms = 300
//! ```
//!
//! Operation times are only copied onto each [`AtomicTask`](crate::AtomicTask)
//! for the worker's benefit. The orchestrator itself never sleeps.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::CalcError;
use crate::types::task::Operator;

/// Largest accepted `queue_capacity`; tokio's bounded channel refuses more.
pub const MAX_QUEUE_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Simulated per-operator durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OperationTimes {
    /// `TIME_ADDITION_MS`
    pub addition_ms: u64,
    /// `TIME_SUBTRACTION_MS`
    pub subtraction_ms: u64,
    /// `TIME_MULTIPLICATIONS_MS`
    pub multiplication_ms: u64,
    /// `TIME_DIVISIONS_MS`
    pub division_ms: u64,
}

impl Default for OperationTimes {
    fn default() -> Self {
        Self {
            addition_ms: 100,
            subtraction_ms: 100,
            multiplication_ms: 200,
            division_ms: 300,
        }
    }
}

impl OperationTimes {
    /// All four operations take `ms` milliseconds.
    pub fn uniform(ms: u64) -> Self {
        Self {
            addition_ms: ms,
            subtraction_ms: ms,
            multiplication_ms: ms,
            division_ms: ms,
        }
    }

    /// Duration hint for `op`.
    pub fn for_operator(&self, op: Operator) -> u64 {
        match op {
            Operator::Add => self.addition_ms,
            Operator::Sub => self.subtraction_ms,
            Operator::Mul => self.multiplication_ms,
            Operator::Div => self.division_ms,
        }
    }
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CalcConfig {
    /// Capacity of the task queue. Enqueueing blocks while it is full.
    pub queue_capacity: usize,

    /// Upper bound on each wait for a sub-result, in milliseconds.
    /// `0` waits forever.
    pub result_timeout_ms: u64,

    /// Duration hints copied onto atomic tasks.
    pub operation_times: OperationTimes,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            result_timeout_ms: 30_000,
            operation_times: OperationTimes::default(),
        }
    }
}

impl CalcConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, CalcError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, CalcError> {
        let content = std::fs::read_to_string(path).map_err(|source| CalcError::ConfigIo {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Builds a configuration from process environment variables.
    ///
    /// Unset variables fall back to defaults; set but unparseable ones are an
    /// error.
    pub fn from_env() -> Result<Self, CalcError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Examples
    ///
    /// ```
    /// use dcalc::CalcConfig;
    ///
    /// let config = CalcConfig::from_lookup(|key| match key {
    ///     "TIME_DIVISIONS_MS" => Some("5".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.operation_times.division_ms, 5);
    /// assert_eq!(config.operation_times.addition_ms, 100);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CalcError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str, default: u64| -> Result<u64, CalcError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|_| CalcError::Config {
                    message: format!("{key} must be a non-negative integer, got {raw:?}"),
                }),
            }
        };

        let config = Self {
            queue_capacity: usize::try_from(read(
                "TASK_QUEUE_CAPACITY",
                defaults.queue_capacity as u64,
            )?)
            .unwrap_or(usize::MAX),
            result_timeout_ms: read("RESULT_TIMEOUT_MS", defaults.result_timeout_ms)?,
            operation_times: OperationTimes {
                addition_ms: read("TIME_ADDITION_MS", defaults.operation_times.addition_ms)?,
                subtraction_ms: read(
                    "TIME_SUBTRACTION_MS",
                    defaults.operation_times.subtraction_ms,
                )?,
                multiplication_ms: read(
                    "TIME_MULTIPLICATIONS_MS",
                    defaults.operation_times.multiplication_ms,
                )?,
                division_ms: read("TIME_DIVISIONS_MS", defaults.operation_times.division_ms)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks semantic constraints.
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.queue_capacity == 0 {
            return Err(CalcError::Config {
                message: "queue_capacity must be at least 1".to_string(),
            });
        }
        if self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(CalcError::Config {
                message: format!(
                    "queue_capacity must be at most {MAX_QUEUE_CAPACITY}, got {}",
                    self.queue_capacity
                ),
            });
        }
        Ok(())
    }

    /// The per-result wait bound, or `None` for an unbounded wait.
    pub fn result_timeout(&self) -> Option<Duration> {
        (self.result_timeout_ms > 0).then(|| Duration::from_millis(self.result_timeout_ms))
    }

    /// Sets the per-result wait bound. `None` waits forever.
    ///
    /// Non-zero durations are rounded up to whole milliseconds, so a
    /// sub-millisecond bound stays bounded.
    pub fn with_result_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.result_timeout_ms = timeout.map_or(0, |d| {
            let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
            if Duration::from_millis(ms) < d {
                ms.saturating_add(1)
            } else {
                ms
            }
        });
        self
    }

    /// Sets the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Sets the operation duration hints.
    pub fn with_operation_times(mut self, times: OperationTimes) -> Self {
        self.operation_times = times;
        self
    }
}
