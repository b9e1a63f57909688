use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use super::is_monitoring_path;
use crate::presentation::api_error::ApiError;
use crate::presentation::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared-secret check. Disabled when no key is configured.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.settings.auth.key() else {
        return next.run(request).await;
    };
    if is_monitoring_path(request.uri().path()) {
        return next.run(request).await;
    }

    let authorized =
        presented_key(request.headers()).is_some_and(|presented| keys_match(presented, expected));
    if !authorized {
        tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated request");
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key.trim());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn keys_match(presented: &str, expected: &str) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}
