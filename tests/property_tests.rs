//! Property-based tests using proptest.
//!
//! - The two-tier fold agrees with a direct precedence evaluator.
//! - Count mismatches are rejected and never put a task on the queue.
//! - A zero divisor stops dispatch at the offending division.
//! - The status state machine only allows `processing` -> terminal.

use async_trait::async_trait;
use proptest::prelude::*;

use dcalc::{
    reduce, tokenize, AtomicTask, CalcConfig, CalcError, Dispatch, ExpressionId,
    ExpressionStatus, FailureReason, Operator, OperationTimes, Orchestrator, Tier,
};

// ─── Helpers ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Local {
    tasks: Vec<AtomicTask>,
}

#[async_trait]
impl Dispatch for Local {
    async fn dispatch(&mut self, task: AtomicTask) -> Result<f64, CalcError> {
        let value = task.evaluate();
        self.tasks.push(task);
        Ok(value)
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn fold(expression: &str) -> (Result<f64, CalcError>, Vec<AtomicTask>) {
    let runtime = runtime();
    let tokens = tokenize(expression).unwrap();
    let mut local = Local::default();
    let result = runtime.block_on(reduce(
        ExpressionId(1),
        tokens,
        &OperationTimes::default(),
        &mut local,
    ));
    (result, local.tasks)
}

/// Evaluates with standard precedence: each `+`/`-` term is a left-to-right
/// product/quotient chain.
fn reference(operands: &[f64], operators: &[Operator]) -> Option<f64> {
    let mut terms: Vec<(Operator, f64)> = Vec::new();
    let mut current = operands[0];
    let mut sign = Operator::Add;
    for (op, rhs) in operators.iter().zip(&operands[1..]) {
        match op {
            Operator::Mul => current *= rhs,
            Operator::Div => {
                if *rhs == 0.0 {
                    return None;
                }
                current /= rhs;
            }
            Operator::Add | Operator::Sub => {
                terms.push((sign, current));
                sign = *op;
                current = *rhs;
            }
        }
    }
    terms.push((sign, current));

    let mut iter = terms.into_iter();
    let (_, mut total) = iter.next()?;
    for (op, value) in iter {
        total = op.apply(total, value);
    }
    Some(total)
}

fn render(operands: &[u32], operators: &[Operator]) -> String {
    let mut text = operands[0].to_string();
    for (op, digit) in operators.iter().zip(&operands[1..]) {
        text.push(op.symbol());
        text.push_str(&digit.to_string());
    }
    text
}

fn arb_operator() -> impl Strategy<Value = Operator> {
    prop::sample::select(Operator::ALL.to_vec())
}

fn arb_expression() -> impl Strategy<Value = (Vec<u32>, Vec<Operator>)> {
    prop::collection::vec(arb_operator(), 0..12).prop_flat_map(|ops| {
        let n = ops.len() + 1;
        (prop::collection::vec(0u32..10, n), Just(ops))
    })
}

/// An expression with at least one `/0`.
fn arb_zero_division() -> impl Strategy<Value = (Vec<u32>, Vec<Operator>)> {
    prop::collection::vec(arb_operator(), 1..12)
        .prop_flat_map(|ops| {
            let n = ops.len() + 1;
            let at = 0..ops.len();
            (prop::collection::vec(0u32..10, n), Just(ops), at)
        })
        .prop_map(|(mut digits, mut ops, at)| {
            ops[at] = Operator::Div;
            digits[at + 1] = 0;
            (digits, ops)
        })
}

// ─── Properties ─────────────────────────────────────────────────────────────

proptest! {
    /// Without a zero divisor, the fold equals standard-precedence evaluation.
    #[test]
    fn fold_matches_precedence((digits, ops) in arb_expression()) {
        let operands: Vec<f64> = digits.iter().map(|d| f64::from(*d)).collect();
        let expected = reference(&operands, &ops);
        let (result, tasks) = fold(&render(&digits, &ops));

        match expected {
            Some(value) => {
                let got = result.unwrap();
                prop_assert!(got == value || (got.is_nan() && value.is_nan()),
                    "fold {} != reference {}", got, value);
                prop_assert_eq!(tasks.len(), ops.len());
            }
            None => {
                let is_div_zero = matches!(result, Err(CalcError::DivisionByZero { .. }));
                prop_assert!(is_div_zero);
            }
        }
    }

    /// All high-tier tasks are dispatched before any low-tier task.
    #[test]
    fn high_tier_first((digits, ops) in arb_expression()) {
        let (_, tasks) = fold(&render(&digits, &ops));
        let first_low = tasks
            .iter()
            .position(|t| matches!(t.operation, Operator::Add | Operator::Sub))
            .unwrap_or(tasks.len());
        prop_assert!(tasks[first_low..]
            .iter()
            .all(|t| matches!(t.operation, Operator::Add | Operator::Sub)));
    }

    /// No task ever divides by zero.
    #[test]
    fn no_zero_divisor_dispatched((digits, ops) in arb_expression()) {
        let (_, tasks) = fold(&render(&digits, &ops));
        prop_assert!(tasks
            .iter()
            .all(|t| !(t.operation == Operator::Div && t.arg2 == 0.0)));
    }

    /// A zero divisor ends the fold right before the offending division:
    /// exactly the high-tier operations to its left were dispatched, in order,
    /// and nothing after it.
    #[test]
    fn zero_divisor_stops_at_offending_division((digits, ops) in arb_zero_division()) {
        let offending = ops
            .iter()
            .enumerate()
            .position(|(i, op)| *op == Operator::Div && digits[i + 1] == 0)
            .unwrap();

        let (result, tasks) = fold(&render(&digits, &ops));
        let is_div_zero = matches!(result, Err(CalcError::DivisionByZero { .. }));
        prop_assert!(is_div_zero);

        let expected: Vec<Operator> = ops[..offending]
            .iter()
            .copied()
            .filter(|op| op.tier() == Tier::High)
            .collect();
        let dispatched: Vec<Operator> = tasks.iter().map(|t| t.operation).collect();
        prop_assert_eq!(dispatched, expected);
    }

    /// Extra operators or operands are rejected, and the expression never
    /// puts a task on the queue.
    #[test]
    fn count_mismatch_rejected(
        digits in prop::collection::vec(0u32..10, 0..8),
        ops in prop::collection::vec(arb_operator(), 0..8),
    ) {
        prop_assume!(digits.len() != ops.len() + 1);
        let mut text = String::new();
        for d in &digits {
            text.push_str(&d.to_string());
        }
        for op in &ops {
            text.push(op.symbol());
        }
        let is_malformed = matches!(tokenize(&text), Err(CalcError::MalformedExpression { .. }));
        prop_assert!(is_malformed);

        let runtime = runtime();
        let (record, queued, active) = runtime.block_on(async {
            let orchestrator = Orchestrator::new(CalcConfig::default()).unwrap();
            let id = orchestrator.submit(text.as_str());
            let record = orchestrator.wait_for(id).await.unwrap();
            (record, orchestrator.try_dequeue(), orchestrator.active_expressions())
        });
        prop_assert_eq!(record.status, ExpressionStatus::Error);
        prop_assert_eq!(record.failure, Some(FailureReason::MalformedExpression));
        prop_assert!(queued.is_none());
        prop_assert_eq!(active, 0);
    }
}

fn arb_status() -> impl Strategy<Value = ExpressionStatus> {
    prop::sample::select(vec![
        ExpressionStatus::Processing,
        ExpressionStatus::Completed,
        ExpressionStatus::Error,
    ])
}

proptest! {
    /// Terminal statuses reject every transition.
    #[test]
    fn terminal_states_reject_all_transitions(
        from in prop::sample::select(vec![ExpressionStatus::Completed, ExpressionStatus::Error]),
        to in arb_status(),
    ) {
        prop_assert!(!from.can_transition_to(&to));
    }

    /// A transition is valid iff it goes from `processing` to a terminal status.
    #[test]
    fn only_processing_to_terminal(from in arb_status(), to in arb_status()) {
        prop_assert_eq!(
            from.can_transition_to(&to),
            from == ExpressionStatus::Processing && to.is_terminal()
        );
    }
}
