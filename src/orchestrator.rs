//! Orchestrator facade.
//!
//! [`Orchestrator`] owns the expression store, task queue, and result
//! registry, and exposes the operations the transport layer and the worker
//! pool need:
//!
//! - inbound: [`submit`](Orchestrator::submit)
//! - workers: [`try_dequeue`](Orchestrator::try_dequeue),
//!   [`deliver_result`](Orchestrator::deliver_result)
//! - queries: [`get_expression`](Orchestrator::get_expression),
//!   [`list_expressions`](Orchestrator::list_expressions),
//!   [`wait_for`](Orchestrator::wait_for)
//!
//! Each accepted expression gets its own engine task, tracked by a
//! `tokio_util` [`TaskTracker`] so [`shutdown`](Orchestrator::shutdown) can
//! cancel and drain them.
//!
//! The orchestrator is cheap to clone; clones share all state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::config::CalcConfig;
use crate::engine::Engine;
use crate::error::CalcError;
use crate::queue::TaskQueue;
use crate::rendezvous::ResultRegistry;
use crate::store::ExpressionStore;
use crate::tokenizer::tokenize;
use crate::types::expression::{ExpressionId, ExpressionRecord, FailureReason};
use crate::types::task::AtomicTask;

/// Entry point for submitting, executing, and querying expressions.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<CalcConfig>,
    store: Arc<ExpressionStore>,
    queue: Arc<TaskQueue>,
    registry: Arc<ResultRegistry>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Orchestrator {
    /// Creates an orchestrator with fresh state sized by `config`.
    pub fn new(config: CalcConfig) -> Result<Self, CalcError> {
        config.validate()?;
        let queue = Arc::new(TaskQueue::new(config.queue_capacity));
        Ok(Self::from_parts(
            config,
            Arc::new(ExpressionStore::new()),
            queue,
            Arc::new(ResultRegistry::new()),
        ))
    }

    /// Creates an orchestrator over existing shared state.
    ///
    /// `config.queue_capacity` is ignored in favour of the queue's own.
    pub fn from_parts(
        config: CalcConfig,
        store: Arc<ExpressionStore>,
        queue: Arc<TaskQueue>,
        registry: Arc<ResultRegistry>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            queue,
            registry,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Accepts `expression` and returns its identity without waiting.
    ///
    /// Malformed input is recorded as `error` right away and never reaches the
    /// engine. Otherwise the reduction is spawned onto the current tokio
    /// runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn submit(&self, expression: impl Into<String>) -> ExpressionId {
        let expression = expression.into();
        let id = self.store.create(expression.as_str());

        let tokens = match tokenize(&expression) {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(expression_id = %id, %expression, error = %err, "rejected expression");
                self.record_failure(id, FailureReason::MalformedExpression);
                return id;
            }
        };

        if self.cancel.is_cancelled() {
            self.record_failure(id, FailureReason::Cancelled);
            return id;
        }

        let slot = match self.registry.register(id) {
            Ok(slot) => slot,
            Err(err) => {
                warn!(expression_id = %id, error = %err, "could not register result slot");
                self.record_failure(id, FailureReason::Cancelled);
                return id;
            }
        };

        info!(expression_id = %id, %expression, "expression accepted");
        let engine = Engine::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            self.config.operation_times.clone(),
            self.config.result_timeout(),
            self.cancel.clone(),
        );
        self.tracker.spawn(engine.run(id, tokens, slot));
        id
    }

    fn record_failure(&self, id: ExpressionId, reason: FailureReason) {
        if let Err(err) = self.store.fail(id, reason) {
            warn!(expression_id = %id, error = %err, "could not record failure");
        }
    }

    /// Returns a snapshot of expression `id`.
    pub fn get_expression(&self, id: ExpressionId) -> Result<ExpressionRecord, CalcError> {
        self.store.get(id)
    }

    /// Returns snapshots of all expressions, ordered by identity.
    pub fn list_expressions(&self) -> Vec<ExpressionRecord> {
        self.store.list()
    }

    /// Resolves once expression `id` reaches a terminal status.
    pub async fn wait_for(&self, id: ExpressionId) -> Result<ExpressionRecord, CalcError> {
        self.store.wait_terminal(id).await
    }

    /// Takes the oldest pending task, or `None` if there is nothing to do.
    pub fn try_dequeue(&self) -> Option<AtomicTask> {
        self.queue.try_dequeue()
    }

    /// Hands a worker's result to the engine waiting on expression `id`.
    ///
    /// Fails with [`CalcError::UnknownExpression`] if `id` is not currently
    /// waiting for a result.
    pub fn deliver_result(&self, id: ExpressionId, value: f64) -> Result<(), CalcError> {
        self.registry.deliver(id, value)
    }

    /// The active configuration.
    pub fn config(&self) -> &CalcConfig {
        &self.config
    }

    /// Number of tasks waiting for a worker.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Number of engines still running.
    pub fn active_expressions(&self) -> usize {
        self.tracker.len()
    }

    /// A token that fires when [`shutdown`](Self::shutdown) begins.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels every running engine and waits for them to record their
    /// terminal state. Later submissions are recorded as cancelled.
    pub async fn shutdown(&self) {
        info!(
            active = self.tracker.len(),
            "shutting down orchestrator"
        );
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}
