//! Worker pool for `dcalc`.
//!
//! Workers pull [`AtomicTask`](dcalc::AtomicTask)s from a [`TaskSource`],
//! wait out the task's simulated duration, compute it, and report the value
//! back against the owning expression.
//!
//! # Module Organization
//!
//! - [`worker`] - The [`Agent`] pool and per-worker loop
//! - [`source`] - The [`TaskSource`] seam (in-process orchestrator impl)
//! - [`http`] - Remote orchestrator over HTTP (feature `http-client`)
//! - [`config`] - [`AgentConfig`]
//! - [`error`] - [`AgentError`]

pub mod config;
pub mod error;
pub mod source;
pub mod worker;

#[cfg(feature = "http-client")]
pub mod http;

pub use config::AgentConfig;
pub use error::AgentError;
pub use source::TaskSource;
pub use worker::{compute, Agent, AgentStats};

#[cfg(feature = "http-client")]
pub use http::HttpTaskSource;
