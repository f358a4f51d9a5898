//! Two-tier precedence fold.
//!
//! [`reduce`] folds validated tokens down to one value. It does two passes,
//! `*`/`/` first and then `+`/`-`. Each pass repeatedly finds the leftmost
//! operator of its tier, dispatches that one operation, and splices the
//! result back in place of the operator and its two operands. A task's
//! inputs can depend on the previous task's output, so tasks for one
//! expression are strictly sequential.
//!
//! Dispatch is abstracted behind [`Dispatch`] so the fold can be driven by the
//! task queue ([`QueueDispatcher`]) or by anything else that can evaluate an
//! [`AtomicTask`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::OperationTimes;
use crate::error::CalcError;
use crate::queue::TaskQueue;
use crate::rendezvous::{ResultRegistry, ResultSlot};
use crate::store::ExpressionStore;
use crate::tokenizer::Tokens;
use crate::types::expression::{ExpressionId, FailureReason};
use crate::types::task::{AtomicTask, Operator, Tier};

/// Evaluates one atomic task, however and wherever that happens.
#[async_trait]
pub trait Dispatch: Send {
    /// Hands `task` off and returns its computed value.
    async fn dispatch(&mut self, task: AtomicTask) -> Result<f64, CalcError>;
}

/// Reduces `tokens` for expression `id` to a single value.
///
/// A `/` whose right operand is zero fails with
/// [`CalcError::DivisionByZero`] before its task is created, and no further
/// tasks are dispatched. Any dispatch error also ends the fold.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use dcalc::{reduce, tokenize, AtomicTask, CalcError, Dispatch, ExpressionId, OperationTimes};
///
/// struct Local(Vec<AtomicTask>);
///
/// #[async_trait]
/// impl Dispatch for Local {
///     async fn dispatch(&mut self, task: AtomicTask) -> Result<f64, CalcError> {
///         let value = task.evaluate();
///         self.0.push(task);
///         Ok(value)
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut local = Local(Vec::new());
/// let tokens = tokenize("3+4*2").unwrap();
/// let value = reduce(ExpressionId(1), tokens, &OperationTimes::default(), &mut local)
///     .await
///     .unwrap();
/// assert_eq!(value, 11.0);
/// assert_eq!(local.0.len(), 2);
/// # }
/// ```
pub async fn reduce<D>(
    id: ExpressionId,
    tokens: Tokens,
    times: &OperationTimes,
    dispatcher: &mut D,
) -> Result<f64, CalcError>
where
    D: Dispatch + ?Sized,
{
    let (mut operands, mut operators) = tokens.into_parts();

    for tier in [Tier::High, Tier::Low] {
        while let Some(pos) = operators.iter().position(|op| op.tier() == tier) {
            let op = operators[pos];
            let (lhs, rhs) = (operands[pos], operands[pos + 1]);

            if op == Operator::Div && rhs == 0.0 {
                return Err(CalcError::DivisionByZero { id });
            }

            let task = AtomicTask::new(id, lhs, rhs, op, times.for_operator(op));
            debug!(expression_id = %id, %op, lhs, rhs, "dispatching atomic task");
            let value = dispatcher.dispatch(task).await?;

            operands.splice(pos..=pos + 1, std::iter::once(value));
            operators.remove(pos);
        }
    }

    match operands.as_slice() {
        [value] => Ok(*value),
        _ => Err(CalcError::MalformedExpression {
            operands: operands.len(),
            operators: operators.len(),
        }),
    }
}

/// Dispatches through the shared [`TaskQueue`] and waits on the expression's
/// [`ResultSlot`].
///
/// Both the enqueue (which blocks while the queue is full) and the wait are
/// abandoned when `cancel` fires.
pub struct QueueDispatcher {
    queue: Arc<TaskQueue>,
    slot: ResultSlot,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl QueueDispatcher {
    /// Creates a dispatcher bound to one expression's slot.
    pub fn new(
        queue: Arc<TaskQueue>,
        slot: ResultSlot,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            slot,
            timeout,
            cancel,
        }
    }
}

#[async_trait]
impl Dispatch for QueueDispatcher {
    async fn dispatch(&mut self, task: AtomicTask) -> Result<f64, CalcError> {
        let Self {
            queue,
            slot,
            timeout,
            cancel,
        } = self;
        let id = task.expression_id;
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CalcError::Cancelled { id }),
            sent = queue.enqueue(task) => sent?,
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CalcError::Cancelled { id }),
            value = slot.wait_timeout(*timeout) => value,
        }
    }
}

/// Runs one expression's reduction and records its terminal state.
///
/// Owns shared handles to the queue, registry, and store; one engine is
/// spawned per submitted expression.
#[derive(Clone)]
pub struct Engine {
    queue: Arc<TaskQueue>,
    registry: Arc<ResultRegistry>,
    store: Arc<ExpressionStore>,
    times: OperationTimes,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Engine {
    /// Creates an engine over the given shared state.
    pub fn new(
        queue: Arc<TaskQueue>,
        registry: Arc<ResultRegistry>,
        store: Arc<ExpressionStore>,
        times: OperationTimes,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            registry,
            store,
            times,
            timeout,
            cancel,
        }
    }

    /// Reduces `tokens` for `id` and writes the terminal record.
    ///
    /// Errors are recorded as the expression's failure reason rather than
    /// returned; the submitter has long since moved on.
    pub async fn run(self, id: ExpressionId, tokens: Tokens, slot: ResultSlot) {
        let mut dispatcher =
            QueueDispatcher::new(Arc::clone(&self.queue), slot, self.timeout, self.cancel.clone());
        let outcome = reduce(id, tokens, &self.times, &mut dispatcher).await;

        self.registry.unregister(id);

        let recorded = match outcome {
            Ok(value) => self.store.complete(id, value),
            Err(err) => {
                warn!(expression_id = %id, error = %err, "evaluation failed");
                self.store.fail(id, failure_reason(&err))
            }
        };
        if let Err(err) = recorded {
            error!(expression_id = %id, error = %err, "could not record terminal state");
        }
    }
}

/// Maps an engine error onto the reason stored on the record.
pub fn failure_reason(err: &CalcError) -> FailureReason {
    match err {
        CalcError::DivisionByZero { .. } => FailureReason::DivisionByZero,
        CalcError::MalformedExpression { .. } => FailureReason::MalformedExpression,
        CalcError::ResultTimeout { .. } => FailureReason::Timeout,
        _ => FailureReason::Cancelled,
    }
}
