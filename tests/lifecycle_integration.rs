//! Full lifecycle integration tests.
//!
//! These tests drive the orchestrator the way a deployment does: expressions
//! are submitted, in-process workers poll the task queue and deliver results,
//! and the tests observe the store until each expression is terminal.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use dcalc::{
    reduce, tokenize, AtomicTask, CalcConfig, CalcError, Dispatch, ExpressionId,
    ExpressionRecord, ExpressionStatus, FailureReason, OperationTimes, Orchestrator,
};

const WAIT: Duration = Duration::from_secs(5);

/// Every task a test worker has seen, in the order it saw them.
type Journal = Arc<Mutex<Vec<AtomicTask>>>;

/// Spawns `count` polling workers that evaluate tasks locally.
fn spawn_workers(orchestrator: &Orchestrator, count: usize, stop: &CancellationToken) -> Journal {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..count {
        let orchestrator = orchestrator.clone();
        let journal = Arc::clone(&journal);
        let stop = stop.clone();
        tokio::spawn(async move {
            while !stop.is_cancelled() {
                match orchestrator.try_dequeue() {
                    Some(task) => {
                        let value = task.evaluate();
                        let id = task.expression_id;
                        journal.lock().push(task);
                        orchestrator.deliver_result(id, value).unwrap();
                    }
                    None => tokio::time::sleep(Duration::from_millis(1)).await,
                }
            }
        });
    }
    journal
}

async fn wait(orchestrator: &Orchestrator, id: ExpressionId) -> ExpressionRecord {
    tokio::time::timeout(WAIT, orchestrator.wait_for(id))
        .await
        .expect("expression did not reach a terminal state")
        .unwrap()
}

fn fast_config() -> CalcConfig {
    CalcConfig::default().with_operation_times(OperationTimes::uniform(0))
}

#[tokio::test]
async fn precedence_example_completes() {
    let orchestrator = Orchestrator::new(fast_config()).unwrap();
    let stop = CancellationToken::new();
    let journal = spawn_workers(&orchestrator, 3, &stop);

    let id = orchestrator.submit("3+4*2");
    let record = wait(&orchestrator, id).await;

    assert_eq!(record.status, ExpressionStatus::Completed);
    assert_eq!(record.result, Some(11.0));
    assert_eq!(record.expression, "3+4*2");
    assert_eq!(record.failure, None);

    let shape: Vec<(f64, char, f64)> = journal
        .lock()
        .iter()
        .map(|t| (t.arg1, t.operation.symbol(), t.arg2))
        .collect();
    assert_eq!(shape, vec![(4.0, '*', 2.0), (3.0, '+', 8.0)]);
    stop.cancel();
}

#[tokio::test]
async fn division_by_zero_enqueues_nothing() {
    let orchestrator = Orchestrator::new(fast_config()).unwrap();

    let id = orchestrator.submit("6/0");
    let record = wait(&orchestrator, id).await;

    assert_eq!(record.status, ExpressionStatus::Error);
    assert_eq!(record.failure, Some(FailureReason::DivisionByZero));
    assert_eq!(record.result, None);
    assert!(orchestrator.try_dequeue().is_none());
}

#[tokio::test]
async fn division_by_zero_stops_after_earlier_tasks() {
    let orchestrator = Orchestrator::new(fast_config()).unwrap();
    let stop = CancellationToken::new();
    let journal = spawn_workers(&orchestrator, 1, &stop);

    let id = orchestrator.submit("2*3+6/0-1");
    let record = wait(&orchestrator, id).await;

    assert_eq!(record.failure, Some(FailureReason::DivisionByZero));
    let ops: Vec<char> = journal.lock().iter().map(|t| t.operation.symbol()).collect();
    assert_eq!(ops, vec!['*']);
    assert_eq!(orchestrator.pending_tasks(), 0);
    stop.cancel();
}

#[tokio::test]
async fn malformed_expression_is_error() {
    let orchestrator = Orchestrator::new(fast_config()).unwrap();

    let id = orchestrator.submit("5+");
    let record = wait(&orchestrator, id).await;

    assert_eq!(record.status, ExpressionStatus::Error);
    assert_eq!(record.failure, Some(FailureReason::MalformedExpression));
    assert_eq!(orchestrator.pending_tasks(), 0);
}

#[tokio::test]
async fn terminal_record_is_stable() {
    let orchestrator = Orchestrator::new(fast_config()).unwrap();
    let stop = CancellationToken::new();
    spawn_workers(&orchestrator, 2, &stop);

    let id = orchestrator.submit("9-2*3");
    let first = wait(&orchestrator, id).await;
    let second = orchestrator.get_expression(id).unwrap();
    let third = orchestrator.get_expression(id).unwrap();

    assert_eq!(first.result, Some(3.0));
    assert_eq!(first, second);
    assert_eq!(second, third);
    stop.cancel();
}

/// Evaluates locally so tests can compute the task sequence they expect.
#[derive(Default)]
struct Expected(Vec<(f64, char, f64)>);

#[async_trait]
impl Dispatch for Expected {
    async fn dispatch(&mut self, task: AtomicTask) -> Result<f64, CalcError> {
        self.0.push((task.arg1, task.operation.symbol(), task.arg2));
        Ok(task.evaluate())
    }
}

#[tokio::test]
async fn concurrent_expressions_keep_their_own_order() {
    let orchestrator = Orchestrator::new(fast_config()).unwrap();
    let stop = CancellationToken::new();
    let journal = spawn_workers(&orchestrator, 4, &stop);

    let inputs = ["1+2*3-4/2", "9*9-8*8+7", "5-4-3-2-1", "8/2/2*3+1"];
    let ids: Vec<ExpressionId> = inputs.iter().map(|e| orchestrator.submit(*e)).collect();

    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1], "identities must increase: {pair:?}");
    }

    for (id, input) in ids.iter().zip(inputs) {
        let record = wait(&orchestrator, *id).await;
        assert_eq!(record.status, ExpressionStatus::Completed, "{input}");
    }

    let mut seen: HashMap<ExpressionId, Vec<(f64, char, f64)>> = HashMap::new();
    for task in journal.lock().iter() {
        seen.entry(task.expression_id)
            .or_default()
            .push((task.arg1, task.operation.symbol(), task.arg2));
    }

    for (id, input) in ids.iter().zip(inputs) {
        let mut expected = Expected::default();
        let value = reduce(*id, tokenize(input).unwrap(), &OperationTimes::default(), &mut expected)
            .await
            .unwrap();
        assert_eq!(seen.get(id), Some(&expected.0), "{input}");
        assert_eq!(orchestrator.get_expression(*id).unwrap().result, Some(value));
    }
    stop.cancel();
}

#[tokio::test]
async fn full_queue_applies_backpressure() {
    let orchestrator = Orchestrator::new(fast_config().with_queue_capacity(1)).unwrap();

    let a = orchestrator.submit("1+1");
    let b = orchestrator.submit("2+2");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(orchestrator.pending_tasks(), 1);

    let stop = CancellationToken::new();
    spawn_workers(&orchestrator, 1, &stop);

    assert_eq!(wait(&orchestrator, a).await.result, Some(2.0));
    assert_eq!(wait(&orchestrator, b).await.result, Some(4.0));
    stop.cancel();
}

#[tokio::test]
async fn stalled_worker_times_out() {
    let config = fast_config().with_result_timeout(Some(Duration::from_millis(50)));
    let orchestrator = Orchestrator::new(config).unwrap();

    let id = orchestrator.submit("3*3");
    let record = wait(&orchestrator, id).await;
    assert_eq!(record.status, ExpressionStatus::Error);
    assert_eq!(record.failure, Some(FailureReason::Timeout));

    // The task is still queued; a worker that picks it up now is too late.
    let task = orchestrator.try_dequeue().unwrap();
    let late = orchestrator.deliver_result(task.expression_id, task.evaluate());
    assert!(matches!(late, Err(CalcError::UnknownExpression { .. })));
    assert_eq!(orchestrator.get_expression(id).unwrap(), record);
}

#[tokio::test]
async fn shutdown_cancels_waiting_engines() {
    let config = fast_config().with_result_timeout(None);
    let orchestrator = Orchestrator::new(config).unwrap();

    let id = orchestrator.submit("1+2");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(orchestrator.active_expressions(), 1);

    tokio::time::timeout(WAIT, orchestrator.shutdown())
        .await
        .unwrap();

    let record = orchestrator.get_expression(id).unwrap();
    assert_eq!(record.status, ExpressionStatus::Error);
    assert_eq!(record.failure, Some(FailureReason::Cancelled));
    assert_eq!(orchestrator.active_expressions(), 0);
}

#[tokio::test]
async fn unknown_expression_queries() {
    let orchestrator = Orchestrator::new(fast_config()).unwrap();
    assert!(matches!(
        orchestrator.get_expression(ExpressionId(404)),
        Err(CalcError::UnknownExpression { .. })
    ));
    assert!(matches!(
        orchestrator.deliver_result(ExpressionId(404), 1.0),
        Err(CalcError::UnknownExpression { .. })
    ));
    assert!(orchestrator.list_expressions().is_empty());
}
