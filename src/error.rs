//! Error types for expression evaluation.
//!
//! Provides [`CalcError`], a single error enum with context fields and an
//! HTTP status mapping for the transport layer.

use crate::types::expression::{ExpressionId, ExpressionStatus};

/// Errors that can occur while submitting, reducing, or querying expressions.
///
/// Errors raised inside a running reduction never reach the submitter; the
/// engine converts them into a terminal `error` record instead. Use
/// [`status_code`](CalcError::status_code) to pick an HTTP status.
///
/// # Examples
///
/// ```
/// use dcalc::{CalcError, ExpressionId};
///
/// let err = CalcError::UnknownExpression { id: ExpressionId(42) };
/// assert_eq!(err.status_code(), 404);
/// assert!(err.to_string().contains("42"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CalcError {
    /// Operand count was not operator count + 1.
    #[error("malformed expression: {operands} operand(s) for {operators} operator(s)")]
    MalformedExpression {
        /// Operands found by the tokenizer.
        operands: usize,
        /// Operators found by the tokenizer.
        operators: usize,
    },

    /// A `/` was about to be dispatched with a zero right-hand operand.
    #[error("division by zero in expression {id}")]
    DivisionByZero {
        /// The offending expression.
        id: ExpressionId,
    },

    /// No expression (or no registered result slot) has this identity.
    #[error("expression not found: {id}")]
    UnknownExpression {
        /// The identity that was looked up.
        id: ExpressionId,
    },

    /// Attempted a status change the state machine does not allow.
    #[error("invalid transition from {from} to {to} for expression {id}")]
    InvalidTransition {
        /// The expression being transitioned.
        id: ExpressionId,
        /// Its current status.
        from: ExpressionStatus,
        /// The rejected target status.
        to: ExpressionStatus,
    },

    /// A result was delivered while the slot still held an unread value.
    #[error("result slot for expression {id} already holds an unread value")]
    SlotOccupied {
        /// The expression whose slot is full.
        id: ExpressionId,
    },

    /// A result slot was registered twice for the same identity.
    #[error("result slot already registered for expression {id}")]
    AlreadyRegistered {
        /// The duplicated identity.
        id: ExpressionId,
    },

    /// The registry dropped the slot's sender while the engine was waiting.
    #[error("result slot for expression {id} was closed")]
    SlotClosed {
        /// The expression whose slot closed.
        id: ExpressionId,
    },

    /// No sub-result arrived within the configured bound.
    #[error("timed out after {waited_ms}ms waiting for a result for expression {id}")]
    ResultTimeout {
        /// The expression that stalled.
        id: ExpressionId,
        /// How long the engine waited.
        waited_ms: u64,
    },

    /// The orchestrator shut down while the expression was processing.
    #[error("evaluation of expression {id} was cancelled")]
    Cancelled {
        /// The interrupted expression.
        id: ExpressionId,
    },

    /// The task queue's receiving half is gone.
    #[error("task queue is closed")]
    QueueClosed,

    /// Semantic configuration failure.
    #[error("config validation error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// The configuration file is not valid TOML or does not match the schema.
    #[error("failed to parse config TOML: {source}")]
    ConfigParse {
        /// Underlying parser error.
        #[from]
        source: toml::de::Error,
    },

    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ConfigIo {
        /// Underlying I/O error.
        source: std::io::Error,
        /// The path that was read.
        path: String,
    },
}

impl CalcError {
    /// Maps this error to an HTTP status code.
    ///
    /// - `400`: `MalformedExpression`, `DivisionByZero`
    /// - `404`: `UnknownExpression`
    /// - `409`: `InvalidTransition`, `SlotOccupied`, `AlreadyRegistered`
    /// - `503`: `QueueClosed`, `Cancelled`
    /// - `504`: `ResultTimeout`
    /// - `500`: everything else
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedExpression { .. } | Self::DivisionByZero { .. } => 400,
            Self::UnknownExpression { .. } => 404,
            Self::InvalidTransition { .. }
            | Self::SlotOccupied { .. }
            | Self::AlreadyRegistered { .. } => 409,
            Self::QueueClosed | Self::Cancelled { .. } => 503,
            Self::ResultTimeout { .. } => 504,
            Self::SlotClosed { .. }
            | Self::Config { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigIo { .. } => 500,
        }
    }

    /// Returns `true` if the error is the caller's mistake rather than a
    /// system fault.
    pub fn is_caller_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
