//! Distributed arithmetic evaluation.
//!
//! `dcalc` accepts an arithmetic expression, decomposes it into a sequence of
//! atomic binary operations that respect operator precedence, and hands those
//! operations to a pool of workers instead of computing them locally. Partial
//! results are folded back into the expression until a single value remains.
//!
//! # Overview
//!
//! An expression moves through a small state machine
//! (`processing` -> `completed`/`error`). Submitting an expression returns its
//! identity immediately; the reduction runs on its own tokio task, pushing one
//! [`AtomicTask`] at a time onto the [`TaskQueue`] and waiting on the
//! expression's [`ResultSlot`] for each sub-result.
//!
//! # Module Organization
//!
//! - [`tokenizer`] - Operand/operator extraction and count validation
//! - [`queue`] - Bounded FIFO of pending atomic tasks
//! - [`rendezvous`] - Keyed single-slot handoff of sub-results
//! - [`engine`] - Two-tier precedence fold
//! - [`store`] - Expression records and their terminal transitions
//! - [`orchestrator`] - The facade tying the above together
//! - [`server`] - HTTP binding (feature `http`)
//!
//! # Examples
//!
//! ```
//! use dcalc::{CalcConfig, Orchestrator};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), dcalc::CalcError> {
//! let orchestrator = Orchestrator::new(CalcConfig::default())?;
//! let id = orchestrator.submit("5+");
//!
//! // Count mismatch is detected before any task is queued.
//! let record = orchestrator.wait_for(id).await?;
//! assert_eq!(record.status, dcalc::ExpressionStatus::Error);
//! assert!(orchestrator.try_dequeue().is_none());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod rendezvous;
pub mod store;
pub mod tokenizer;
pub mod types;

#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "http")]
pub mod server;

// Re-exports for ergonomic access
pub use config::{CalcConfig, OperationTimes};
pub use engine::{reduce, Dispatch};
pub use error::CalcError;
pub use orchestrator::Orchestrator;
pub use queue::TaskQueue;
pub use rendezvous::{ResultRegistry, ResultSlot};
pub use store::ExpressionStore;
pub use tokenizer::{tokenize, Tokens};
pub use types::*;
