//! Core domain and wire types.
//!
//! - [`expression`] - Expression identity, status state machine, and records
//! - [`task`] - Operators and the atomic task handed to workers

pub mod expression;
pub mod task;

pub use expression::{ExpressionId, ExpressionRecord, ExpressionStatus, FailureReason};
pub use task::{AtomicTask, Operator, TaskResult, Tier};
