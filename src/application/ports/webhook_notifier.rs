use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Job, JobOutcome, WebhookTarget};

pub const CACHED_JOB_ID: &str = "cached";

/// Body POSTed to a caller's callback once a job reaches a terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub job_id: String,
    pub target_id: String,
    pub status: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl WebhookPayload {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.to_string(),
            target_id: job.target_id.to_string(),
            status: job.status.to_string(),
            result: job.result.as_ref().map(outcome_json),
            error: job.error.clone(),
        }
    }

    /// Payload for a request answered from the output cache without a job.
    pub fn cached(target_id: &str, result: serde_json::Value) -> Self {
        Self {
            job_id: CACHED_JOB_ID.to_string(),
            target_id: target_id.to_string(),
            status: "completed".to_string(),
            result: Some(result),
            error: None,
        }
    }
}

fn outcome_json(outcome: &JobOutcome) -> serde_json::Value {
    serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null)
}

#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    /// Returns the HTTP status the callback answered with.
    async fn notify(
        &self,
        target: &WebhookTarget,
        payload: &WebhookPayload,
    ) -> Result<u16, WebhookError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("invalid webhook url: {0}")]
    InvalidUrl(String),
    #[error("client setup failed: {0}")]
    Client(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}
