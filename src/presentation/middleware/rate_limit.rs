use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::client_ip::client_identity;
use super::is_monitoring_path;
use crate::application::services::RateDecision;
use crate::presentation::api_error::ApiError;
use crate::presentation::state::AppState;

/// Sliding-window limit per client. Monitoring endpoints are never limited.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_monitoring_path(request.uri().path()) || !state.rate_limiter.is_enabled() {
        return next.run(request).await;
    }

    let client = client_identity(&request, state.settings.server.trust_proxy_headers);
    match state.rate_limiter.allow(&client) {
        RateDecision::Allowed => next.run(request).await,
        RateDecision::Limited { retry_after_secs } => {
            tracing::warn!(client = %client, retry_after_secs, "Rate limit exceeded");
            ApiError::RateLimited {
                message: "Rate limit exceeded".to_string(),
                retry_after_secs,
            }
            .into_response()
        }
    }
}
