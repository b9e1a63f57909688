use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};

use crate::application::ports::QueryRequest;
use crate::presentation::api_error::ApiError;
use crate::presentation::state::AppState;

pub const QUERY_MODES: [&str; 5] = ["hybrid", "local", "global", "naive", "mix"];

#[derive(Debug, Deserialize)]
pub struct QueryRequestBody {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub context_only: bool,
}

fn default_mode() -> String {
    "hybrid".to_string()
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub query: String,
    pub mode: String,
    pub context_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[tracing::instrument(skip(state, body))]
pub async fn query_handler(
    State(state): State<AppState>,
    body: Result<Json<QueryRequestBody>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(body) = body?;
    let query = body.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::InvalidInput("Missing query".to_string()));
    }

    let mode = body.mode.trim().to_lowercase();
    if !QUERY_MODES.contains(&mode.as_str()) {
        return Err(ApiError::InvalidInput(format!(
            "Invalid mode: {}. Expected one of: {}",
            body.mode,
            QUERY_MODES.join(", ")
        )));
    }

    tracing::debug!(query_chars = query.chars().count(), mode = %mode, "Querying knowledge base");

    let request = QueryRequest {
        query: query.clone(),
        mode: mode.clone(),
        context_only: body.context_only,
    };
    let timeout = Duration::from_secs(state.settings.backend.query_timeout_secs);
    let result = match tokio::time::timeout(timeout, state.backend.query(&request)).await {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => return Err(ApiError::Internal(format!("query failed: {e}"))),
        Err(_) => return Err(ApiError::Internal("query timed out".to_string())),
    };

    let (answer, context) = if body.context_only {
        (None, Some(result))
    } else {
        (Some(result), None)
    };

    Ok(Json(QueryResponse {
        success: true,
        query,
        mode,
        context_only: body.context_only,
        answer,
        context,
    }))
}
