//! Error types for the worker agent.

use dcalc::{CalcError, ExpressionId};

/// Errors a worker can hit while fetching tasks or reporting results.
///
/// Every variant is recoverable from the worker's point of view: the worker
/// logs it, backs off, and polls again.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The orchestrator answered with an unexpected HTTP status.
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// The orchestrator could not be reached.
    #[error("connection error: {message}")]
    Connection {
        /// Transport error text.
        message: String,
    },

    /// The orchestrator's response could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Decoder error text.
        message: String,
    },

    /// Nothing is waiting for a result for this expression any more.
    #[error("orchestrator has no pending result for expression {id}")]
    UnknownExpression {
        /// The expression the result was for.
        id: ExpressionId,
    },

    /// The in-process orchestrator rejected the request.
    #[error(transparent)]
    Orchestrator(#[from] CalcError),

    /// Agent settings are invalid.
    #[error("agent config error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },
}

impl AgentError {
    /// Returns `true` if the error means the orchestrator is unreachable,
    /// as opposed to having rejected one specific request.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Classifies a [`reqwest::Error`].
    #[cfg(feature = "http-client")]
    pub fn classify_reqwest(err: &reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            Self::Connection {
                message: err.to_string(),
            }
        }
    }
}
