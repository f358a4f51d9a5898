//! HTTP task source for workers running apart from the orchestrator.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use dcalc::{AtomicTask, ExpressionId, TaskResult};

use crate::error::AgentError;
use crate::source::TaskSource;

#[derive(Debug, Deserialize)]
struct TaskEnvelope {
    task: AtomicTask,
}

/// Talks to a remote orchestrator's worker API.
///
/// - `GET {base}/internal/task` - `200 {"task": ...}` or `404` when idle
/// - `POST {base}/internal/task` - `{"id": n, "result": x}`
#[derive(Debug, Clone)]
pub struct HttpTaskSource {
    client: Client,
    base_url: String,
}

impl HttpTaskSource {
    /// Creates a source for the orchestrator at `base_url`
    /// (e.g. `http://localhost:8080`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| AgentError::classify_reqwest(&err))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a source that reuses an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn task_url(&self) -> String {
        format!("{}/internal/task", self.base_url)
    }
}

#[async_trait]
impl TaskSource for HttpTaskSource {
    async fn next_task(&self) -> Result<Option<AtomicTask>, AgentError> {
        let response = self
            .client
            .get(self.task_url())
            .send()
            .await
            .map_err(|err| AgentError::classify_reqwest(&err))?;

        match response.status() {
            StatusCode::OK => {
                let envelope: TaskEnvelope = response
                    .json()
                    .await
                    .map_err(|err| AgentError::classify_reqwest(&err))?;
                Ok(Some(envelope.task))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(AgentError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn submit_result(&self, id: ExpressionId, value: f64) -> Result<(), AgentError> {
        let response = self
            .client
            .post(self.task_url())
            .json(&TaskResult { id, result: value })
            .send()
            .await
            .map_err(|err| AgentError::classify_reqwest(&err))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(AgentError::UnknownExpression { id }),
            status => Err(AgentError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_trimmed() {
        let source = HttpTaskSource::with_client(Client::new(), "http://localhost:8080/");
        assert_eq!(source.task_url(), "http://localhost:8080/internal/task");
    }

    #[test]
    fn envelope_parses_wire_task() {
        let envelope: TaskEnvelope = serde_json::from_str(
            r#"{"task":{"id":3,"arg1":4.0,"arg2":2.0,"operation":"*","operation_time":200}}"#,
        )
        .unwrap();
        assert_eq!(envelope.task.expression_id, ExpressionId(3));
        assert_eq!(envelope.task.evaluate(), 8.0);
    }
}
