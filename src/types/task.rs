//! Atomic task wire types.
//!
//! An [`AtomicTask`] is one binary operation handed to a worker. Workers answer
//! with a [`TaskResult`] keyed by the owning expression's identity. Field names
//! on the wire are `id`, `arg1`, `arg2`, `operation`, and `operation_time`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::expression::ExpressionId;

/// Precedence tier of an operator. `High` is folded before `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// `*` and `/`.
    High,
    /// `+` and `-`.
    Low,
}

/// A binary arithmetic operator.
///
/// # Examples
///
/// ```
/// use dcalc::{Operator, Tier};
///
/// assert_eq!(Operator::from_symbol('*'), Some(Operator::Mul));
/// assert_eq!(Operator::Mul.tier(), Tier::High);
/// assert_eq!(Operator::Sub.apply(7.0, 2.0), 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Addition.
    #[serde(rename = "+")]
    Add,
    /// Subtraction.
    #[serde(rename = "-")]
    Sub,
    /// Multiplication.
    #[serde(rename = "*")]
    Mul,
    /// Division.
    #[serde(rename = "/")]
    Div,
}

impl Operator {
    /// Every operator, in symbol order `+ - * /`.
    pub const ALL: [Operator; 4] = [Self::Add, Self::Sub, Self::Mul, Self::Div];

    /// Classifies a character, returning `None` for anything but `+ - * /`.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' => Some(Self::Mul),
            '/' => Some(Self::Div),
            _ => None,
        }
    }

    /// The operator's symbol.
    pub fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    /// The precedence tier this operator is folded in.
    pub fn tier(&self) -> Tier {
        match self {
            Self::Mul | Self::Div => Tier::High,
            Self::Add | Self::Sub => Tier::Low,
        }
    }

    /// Applies the operator with IEEE-754 semantics.
    ///
    /// Division by zero yields an infinity or NaN here; the engine rejects a
    /// zero divisor before a task is ever created.
    pub fn apply(&self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One binary operation request.
///
/// Created by the engine each time it folds an operator, consumed exactly once
/// by one worker, and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicTask {
    /// The expression this task belongs to. Results are delivered against it.
    #[serde(rename = "id")]
    pub expression_id: ExpressionId,

    /// Left operand.
    pub arg1: f64,

    /// Right operand.
    pub arg2: f64,

    /// Operator to apply.
    pub operation: Operator,

    /// Simulated duration hint in milliseconds. Informational only.
    #[serde(rename = "operation_time")]
    pub operation_time_ms: u64,
}

impl AtomicTask {
    /// Creates a task for `lhs <operation> rhs`.
    pub fn new(
        expression_id: ExpressionId,
        arg1: f64,
        arg2: f64,
        operation: Operator,
        operation_time_ms: u64,
    ) -> Self {
        Self {
            expression_id,
            arg1,
            arg2,
            operation,
            operation_time_ms,
        }
    }

    /// The simulated duration hint as a [`Duration`].
    pub fn operation_time(&self) -> Duration {
        Duration::from_millis(self.operation_time_ms)
    }

    /// Evaluates the task locally.
    pub fn evaluate(&self) -> f64 {
        self.operation.apply(self.arg1, self.arg2)
    }
}

/// A worker's answer for one atomic task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Owning expression.
    pub id: ExpressionId,
    /// Computed value.
    pub result: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operator_symbols_are_stable() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(Operator::from_symbol('%'), None);
        assert_eq!(Operator::from_symbol('7'), None);
    }

    #[test]
    fn tiers() {
        assert_eq!(Operator::Mul.tier(), Tier::High);
        assert_eq!(Operator::Div.tier(), Tier::High);
        assert_eq!(Operator::Add.tier(), Tier::Low);
        assert_eq!(Operator::Sub.tier(), Tier::Low);
    }

    #[test]
    fn task_wire_shape() {
        let task = AtomicTask::new(ExpressionId(4), 6.0, 3.0, Operator::Div, 300);
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 4,
                "arg1": 6.0,
                "arg2": 3.0,
                "operation": "/",
                "operation_time": 300
            })
        );
        assert_eq!(task.evaluate(), 2.0);
        assert_eq!(task.operation_time(), Duration::from_millis(300));
    }

    #[test]
    fn task_result_parses_from_worker_payload() {
        let parsed: TaskResult = serde_json::from_value(json!({"id": 9, "result": 15.0})).unwrap();
        assert_eq!(parsed.id, ExpressionId(9));
        assert_eq!(parsed.result, 15.0);
    }
}
