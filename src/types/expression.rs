//! Expression identity, lifecycle status, and stored records.
//!
//! # Serialization
//!
//! Records serialize with snake_case field names. `result` is always present
//! (`null` until the expression completes) and `failure` is omitted unless
//! the expression ended in the `error` state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CalcError;

/// Identity of a submitted expression.
///
/// Identities are assigned by the [`ExpressionStore`](crate::ExpressionStore)
/// from a monotonically increasing counter starting at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionId(pub u64);

impl fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ExpressionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Expression lifecycle status.
///
/// # State Machine
///
/// ```text
/// Processing -> Completed, Error
/// Completed  -> (terminal, no transitions)
/// Error      -> (terminal, no transitions)
/// ```
///
/// # Examples
///
/// ```
/// use dcalc::ExpressionStatus;
///
/// assert!(!ExpressionStatus::Processing.is_terminal());
/// assert!(ExpressionStatus::Processing.can_transition_to(&ExpressionStatus::Completed));
/// assert!(!ExpressionStatus::Completed.can_transition_to(&ExpressionStatus::Error));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionStatus {
    /// The expression is being reduced.
    Processing,
    /// A final value is available (terminal).
    Completed,
    /// The expression could not be evaluated (terminal).
    Error,
}

impl fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl ExpressionStatus {
    /// Returns `true` for `Completed` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns `true` if moving from this status to `next` is allowed.
    ///
    /// Only `Processing` may move, and only to a terminal status.
    pub fn can_transition_to(&self, next: &Self) -> bool {
        matches!(self, Self::Processing) && next.is_terminal()
    }

    /// Validates a transition, returning [`CalcError::InvalidTransition`] when
    /// it is not allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dcalc::{ExpressionId, ExpressionStatus};
    ///
    /// let id = ExpressionId(7);
    /// assert!(ExpressionStatus::Processing
    ///     .validate_transition(id, &ExpressionStatus::Error)
    ///     .is_ok());
    /// assert!(ExpressionStatus::Error
    ///     .validate_transition(id, &ExpressionStatus::Completed)
    ///     .is_err());
    /// ```
    pub fn validate_transition(&self, id: ExpressionId, next: &Self) -> Result<(), CalcError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CalcError::InvalidTransition {
                id,
                from: *self,
                to: *next,
            })
        }
    }
}

/// Why an expression ended in the `error` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Operand count was not operator count + 1.
    MalformedExpression,
    /// A `/` had a zero right-hand operand.
    DivisionByZero,
    /// No worker delivered a sub-result within the configured bound.
    Timeout,
    /// The orchestrator shut down while the expression was processing.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedExpression => write!(f, "malformed_expression"),
            Self::DivisionByZero => write!(f, "division_by_zero"),
            Self::Timeout => write!(f, "timeout"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Snapshot of one expression as held by the store.
///
/// Once `status` is terminal the record never changes again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionRecord {
    /// Identity assigned on submission.
    pub id: ExpressionId,

    /// Original expression text, as submitted.
    pub expression: String,

    /// Current lifecycle status.
    pub status: ExpressionStatus,

    /// Final value; `Some` only when `status` is `Completed`.
    pub result: Option<f64>,

    /// Failure cause; `Some` only when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,

    /// When the expression was submitted.
    pub created_at: DateTime<Utc>,

    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl ExpressionRecord {
    /// Creates a fresh `processing` record.
    pub fn new(id: ExpressionId, expression: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            expression: expression.into(),
            status: ExpressionStatus::Processing,
            result: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the record has reached a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
