//! Where workers get tasks from and send results to.
//!
//! [`TaskSource`] is the seam between the worker loop and the orchestrator.
//! [`dcalc::Orchestrator`] implements it directly for in-process workers;
//! [`HttpTaskSource`](crate::http::HttpTaskSource) reaches a remote
//! orchestrator over its `/internal/task` endpoints.

use async_trait::async_trait;

use dcalc::{AtomicTask, CalcError, ExpressionId, Orchestrator};

use crate::error::AgentError;

/// A queue of atomic tasks plus a sink for their results.
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Takes the next task, or `Ok(None)` if there is nothing to do right now.
    async fn next_task(&self) -> Result<Option<AtomicTask>, AgentError>;

    /// Reports `value` as the result of the task owned by expression `id`.
    async fn submit_result(&self, id: ExpressionId, value: f64) -> Result<(), AgentError>;
}

#[async_trait]
impl TaskSource for Orchestrator {
    async fn next_task(&self) -> Result<Option<AtomicTask>, AgentError> {
        Ok(self.try_dequeue())
    }

    async fn submit_result(&self, id: ExpressionId, value: f64) -> Result<(), AgentError> {
        self.deliver_result(id, value).map_err(|err| match err {
            CalcError::UnknownExpression { id } => AgentError::UnknownExpression { id },
            other => AgentError::Orchestrator(other),
        })
    }
}
