//! HTTP binding for the orchestrator.
//!
//! Public API:
//!
//! - `POST /api/v1/calculate` - submit `{"expression": "..."}`, returns `201 {"id": n}`
//! - `GET /api/v1/expressions` - `{"expressions": [...]}` ordered by id
//! - `GET /api/v1/expressions/{id}` - `{"expression": {...}}` or `404`
//!
//! Worker API:
//!
//! - `GET /internal/task` - `{"task": {...}}` or `404` when the queue is empty
//! - `POST /internal/task` (alias `/internal/task/result`) - report
//!   `{"id": n, "result": x}`; `404` if nothing is waiting on `id`

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::orchestrator::Orchestrator;

pub mod handlers;

/// Builds the router over `orchestrator`.
pub fn router(orchestrator: Orchestrator) -> Router {
    Router::new()
        .route("/api/v1/calculate", post(handlers::calculate))
        .route("/api/v1/expressions", get(handlers::list_expressions))
        .route("/api/v1/expressions/{id}", get(handlers::get_expression))
        .route(
            "/internal/task",
            get(handlers::next_task).post(handlers::submit_result),
        )
        .route("/internal/task/result", post(handlers::submit_result))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

/// Serves the API on `addr` until the orchestrator's cancellation token fires.
///
/// Returns the bound address through `on_bound` before accepting connections,
/// which lets callers pass port `0`.
pub async fn serve(
    orchestrator: Orchestrator,
    addr: SocketAddr,
    on_bound: impl FnOnce(SocketAddr),
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;
    on_bound(bound);
    info!("dcalc API listening on http://{}", bound);

    let shutdown = orchestrator.cancellation_token();
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}
