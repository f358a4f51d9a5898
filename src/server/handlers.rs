//! Request handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::CalcError;
use crate::orchestrator::Orchestrator;
use crate::types::expression::{ExpressionId, ExpressionRecord};
use crate::types::task::{AtomicTask, TaskResult};

/// Error body returned for every failed request.
#[derive(Debug)]
pub struct ApiError(CalcError);

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// `POST /api/v1/calculate` body.
#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    /// Expression text, e.g. `"3+4*2"`.
    pub expression: String,
}

/// `POST /api/v1/calculate` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CalculateResponse {
    /// Identity assigned to the submitted expression.
    pub id: ExpressionId,
}

/// `GET /api/v1/expressions` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpressionsResponse {
    /// Every known expression, ordered by id.
    pub expressions: Vec<ExpressionRecord>,
}

/// `GET /api/v1/expressions/{id}` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExpressionResponse {
    /// The requested expression.
    pub expression: ExpressionRecord,
}

/// `GET /internal/task` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    /// The oldest pending atomic task.
    pub task: AtomicTask,
}

/// Accepts an expression and answers `201` with its id; evaluation continues
/// in the background.
pub async fn calculate(
    State(orchestrator): State<Orchestrator>,
    Json(request): Json<CalculateRequest>,
) -> (StatusCode, Json<CalculateResponse>) {
    let id = orchestrator.submit(request.expression);
    (StatusCode::CREATED, Json(CalculateResponse { id }))
}

/// Lists all expressions.
pub async fn list_expressions(
    State(orchestrator): State<Orchestrator>,
) -> Json<ExpressionsResponse> {
    Json(ExpressionsResponse {
        expressions: orchestrator.list_expressions(),
    })
}

/// Returns one expression, or `404` if the id is unknown.
pub async fn get_expression(
    State(orchestrator): State<Orchestrator>,
    Path(id): Path<u64>,
) -> Result<Json<ExpressionResponse>, ApiError> {
    let expression = orchestrator.get_expression(ExpressionId(id))?;
    Ok(Json(ExpressionResponse { expression }))
}

/// Hands the oldest pending task to a worker, or `404` when the queue is empty.
pub async fn next_task(State(orchestrator): State<Orchestrator>) -> Response {
    match orchestrator.try_dequeue() {
        Some(task) => {
            debug!(expression_id = %task.expression_id, op = %task.operation, "task handed out");
            Json(TaskResponse { task }).into_response()
        }
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "no tasks" }))).into_response(),
    }
}

/// Accepts a worker's result: `404` if nothing waits on the id, `409` if a
/// result is already pending for it.
pub async fn submit_result(
    State(orchestrator): State<Orchestrator>,
    Json(report): Json<TaskResult>,
) -> Result<StatusCode, ApiError> {
    orchestrator.deliver_result(report.id, report.result)?;
    Ok(StatusCode::OK)
}
