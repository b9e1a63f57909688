use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{
    health_handler, job_status_handler, list_jobs_handler, process_handler, process_sync_handler,
    query_handler, reset_circuit_breaker_handler, status_handler,
};
use crate::presentation::middleware::{auth_middleware, rate_limit_middleware};
use crate::presentation::state::AppState;

/// Layers run outside-in: request id, tracing, CORS, rate limit, then auth,
/// so unauthenticated floods are still counted against the client.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let body_limit = state.settings.server.max_request_body_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/process", post(process_handler))
        .route("/process/sync", post(process_sync_handler))
        .route("/query", post(query_handler))
        .route("/jobs", get(list_jobs_handler))
        .route("/jobs/{job_id}", get(job_status_handler))
        .route("/reset-circuit-breaker", get(reset_circuit_breaker_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
