use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::application::ports::WebhookPayload;
use crate::application::services::{CachedOutput, JobQueueError, JobSubmission};
use crate::domain::{JobId, JobStatus, ParserKind, TargetId, WebhookTarget};
use crate::presentation::api_error::ApiError;
use crate::presentation::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessRequestBody {
    #[serde(default, alias = "paper_id")]
    pub target_id: Option<String>,
    #[serde(default, alias = "pdf_path")]
    pub input_path: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default, alias = "force_parser")]
    pub parser: Option<String>,
    #[serde(default)]
    pub force_reprocess: bool,
}

#[derive(Serialize)]
pub struct ProcessAcceptedResponse {
    pub success: bool,
    pub message: String,
    pub job_id: JobId,
    pub target_id: TargetId,
    pub status: JobStatus,
    pub poll_url: String,
    pub webhook_configured: bool,
}

#[derive(Serialize)]
pub struct CachedResponse {
    pub success: bool,
    pub cached: bool,
    pub message: String,
    pub target_id: TargetId,
    pub output_dir: String,
    pub markdown_length: u64,
    pub hint: String,
}

#[tracing::instrument(skip(state, body))]
pub async fn process_handler(
    State(state): State<AppState>,
    body: Result<Json<ProcessRequestBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    if !state.circuit_breaker.can_proceed() {
        tracing::warn!("Rejecting submission: circuit breaker open");
        return Err(ApiError::CircuitOpen {
            retry_after_secs: state.circuit_breaker.recovery_timeout().as_secs(),
        });
    }

    if !state.job_queue.can_accept() {
        return Err(JobQueueError::Full {
            capacity: state.job_queue.capacity(),
        }
        .into());
    }

    let Json(body) = body?;
    let (Some(target_raw), Some(input_raw)) = (
        non_blank(body.target_id.as_deref()),
        non_blank(body.input_path.as_deref()),
    ) else {
        return Err(ApiError::InvalidInput(
            "Missing input_path or target_id".to_string(),
        ));
    };
    let target_id = TargetId::new(target_raw);
    let input_raw = input_raw.to_string();

    let forced_parser = match non_blank(body.parser.as_deref()) {
        Some(name) => Some(name.parse::<ParserKind>()?),
        None => None,
    };

    let webhook = match non_blank(body.webhook_url.as_deref()) {
        Some(raw) => Some(state.webhook_guard.sanitize(raw).await?),
        None => None,
    };

    if !body.force_reprocess
        && let Some(cached) = find_cached(&state, &target_id).await?
    {
        return Ok(cached_response(&state, target_id, cached, webhook));
    }

    let guard = Arc::clone(&state.path_guard);
    let input_path = tokio::task::spawn_blocking(move || guard.resolve(&input_raw))
        .await
        .map_err(|e| ApiError::Internal(format!("path validation task failed: {e}")))??;

    let job = state.job_queue.submit(JobSubmission {
        target_id,
        input_path,
        webhook,
        forced_parser,
        force_reprocess: body.force_reprocess,
    })?;

    let response = ProcessAcceptedResponse {
        success: true,
        message: "Job submitted for processing".to_string(),
        poll_url: format!("/jobs/{}", job.id),
        job_id: job.id,
        target_id: job.target_id,
        status: job.status,
        webhook_configured: job.webhook.is_some(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

async fn find_cached(
    state: &AppState,
    target_id: &TargetId,
) -> Result<Option<CachedOutput>, ApiError> {
    let layout = Arc::clone(&state.output_layout);
    let target = target_id.clone();
    let lookup = tokio::task::spawn_blocking(move || layout.find_cached(&target))
        .await
        .map_err(|e| ApiError::Internal(format!("cache lookup task failed: {e}")))?;

    match lookup {
        Ok(found) => Ok(found),
        Err(e) => {
            tracing::warn!(error = %e, target_id = %target_id, "Output cache lookup failed");
            Ok(None)
        }
    }
}

fn cached_response(
    state: &AppState,
    target_id: TargetId,
    cached: CachedOutput,
    webhook: Option<WebhookTarget>,
) -> Response {
    let output_dir = state.output_layout.display_path(&cached.output_dir);
    tracing::info!(target_id = %target_id, "Returning cached output");

    if let Some(target) = webhook {
        let payload = WebhookPayload::cached(
            target_id.as_str(),
            serde_json::json!({
                "success": true,
                "cached": true,
                "output_dir": output_dir,
                "markdown_length": cached.markdown_length,
            }),
        );
        let notifier = Arc::clone(&state.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&target, &payload).await {
                tracing::warn!(error = %e, "Webhook for cached result failed");
            }
        });
    }

    let response = CachedResponse {
        success: true,
        cached: true,
        message: "Already processed - returning cached result".to_string(),
        target_id,
        output_dir,
        markdown_length: cached.markdown_length,
        hint: "Use force_reprocess=true to reprocess".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Synchronous processing was removed; callers get pointed at the async flow.
pub async fn process_sync_handler() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "success": false,
            "error": "Sync processing deprecated. Use POST /process for async processing with webhook callback.",
            "migration": {
                "new_endpoint": "POST /process",
                "new_params": {
                    "input_path": "path to PDF",
                    "target_id": "document ID",
                    "webhook_url": "optional callback URL when processing completes",
                },
                "poll_endpoint": "GET /jobs/{job_id}",
            },
        })),
    )
}
