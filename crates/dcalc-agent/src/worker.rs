//! Worker pool.
//!
//! [`Agent`] spawns `computing_power` workers via a `tokio_util`
//! [`TaskTracker`]. Each worker loops independently:
//!
//! 1. poll the [`TaskSource`]
//! 2. on an empty poll, sleep `poll_interval`; on a transport error, sleep
//!    `error_backoff`
//! 3. otherwise sleep the task's simulated duration, compute, and report
//!
//! All sleeps are cut short by the agent's [`CancellationToken`]. A task that
//! was already taken when cancellation fires is still computed and reported
//! before the worker exits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use dcalc::AtomicTask;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::source::TaskSource;

/// Computes one atomic task.
///
/// A zero divisor yields `0.0` rather than an infinity; the orchestrator never
/// sends one, but a hand-crafted request might.
pub fn compute(task: &AtomicTask) -> f64 {
    match task.operation {
        dcalc::Operator::Div if task.arg2 == 0.0 => 0.0,
        _ => task.evaluate(),
    }
}

/// Counters shared by every worker of one agent.
#[derive(Debug, Default)]
pub struct AgentStats {
    computed: AtomicU64,
    rejected: AtomicU64,
    errors: AtomicU64,
}

impl AgentStats {
    /// Results accepted by the orchestrator.
    pub fn computed(&self) -> u64 {
        self.computed.load(Ordering::Relaxed)
    }

    /// Results the orchestrator no longer wanted.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Failed polls or reports.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// A pool of workers draining one [`TaskSource`].
pub struct Agent {
    config: AgentConfig,
    source: Arc<dyn TaskSource>,
    cancel: CancellationToken,
    tracker: TaskTracker,
    stats: Arc<AgentStats>,
}

impl Agent {
    /// Creates an agent; no workers run until [`start`](Self::start).
    pub fn new(config: AgentConfig, source: Arc<dyn TaskSource>) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            stats: Arc::new(AgentStats::default()),
        })
    }

    /// Ties the agent's lifetime to `token`: cancelling it stops the workers.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Spawns the workers onto the current tokio runtime.
    pub fn start(&self) {
        info!(workers = self.config.computing_power, "starting agent");
        for worker_id in 0..self.config.computing_power {
            self.tracker.spawn(worker_loop(
                worker_id,
                Arc::clone(&self.source),
                self.config.clone(),
                self.cancel.clone(),
                Arc::clone(&self.stats),
            ));
        }
    }

    /// Shared counters.
    pub fn stats(&self) -> Arc<AgentStats> {
        Arc::clone(&self.stats)
    }

    /// Number of workers still running.
    pub fn running_workers(&self) -> usize {
        self.tracker.len()
    }

    /// Stops every worker and waits for them to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!(computed = self.stats.computed(), "agent stopped");
    }
}

/// Sleeps for `duration`; returns `false` if cancelled first.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

async fn worker_loop(
    worker_id: usize,
    source: Arc<dyn TaskSource>,
    config: AgentConfig,
    cancel: CancellationToken,
    stats: Arc<AgentStats>,
) {
    debug!(worker_id, "worker started");
    while !cancel.is_cancelled() {
        let task = match source.next_task().await {
            Ok(Some(task)) => task,
            Ok(None) => {
                if !pause(config.poll_interval(), &cancel).await {
                    break;
                }
                continue;
            }
            Err(err) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(worker_id, error = %err, "failed to fetch task");
                if !pause(config.error_backoff(), &cancel).await {
                    break;
                }
                continue;
            }
        };

        // Taken tasks are always reported, even when cancelled mid-sleep.
        if config.simulate_latency && !pause(task.operation_time(), &cancel).await {
            debug!(worker_id, expression_id = %task.expression_id, "finishing in-flight task");
        }

        let value = compute(&task);
        let id = task.expression_id;
        debug!(worker_id, expression_id = %id, op = %task.operation, value, "computed");

        match source.submit_result(id, value).await {
            Ok(()) => {
                stats.computed.fetch_add(1, Ordering::Relaxed);
            }
            Err(AgentError::UnknownExpression { id }) => {
                stats.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(worker_id, expression_id = %id, "result no longer wanted");
            }
            Err(err) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(worker_id, expression_id = %id, error = %err, "failed to report result");
                if err.is_transport() && !pause(config.error_backoff(), &cancel).await {
                    break;
                }
            }
        }
    }
    debug!(worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcalc::{ExpressionId, Operator};

    #[test]
    fn compute_matches_operator() {
        let task = AtomicTask::new(ExpressionId(1), 7.0, 2.0, Operator::Sub, 0);
        assert_eq!(compute(&task), 5.0);
        let task = AtomicTask::new(ExpressionId(1), 7.0, 2.0, Operator::Div, 0);
        assert_eq!(compute(&task), 3.5);
    }

    #[test]
    fn compute_zero_divisor_is_zero() {
        let task = AtomicTask::new(ExpressionId(1), 7.0, 0.0, Operator::Div, 0);
        assert_eq!(compute(&task), 0.0);
    }

    #[tokio::test]
    async fn pause_is_cancellable() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!pause(Duration::from_secs(60), &cancel).await);
    }
}
