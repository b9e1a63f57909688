use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::application::ports::StoreStats;
use crate::application::services::{BreakerStatus, QueueStatus};
use crate::domain::ParserKind;
use crate::infrastructure::system::CapacityPlan;
use crate::presentation::state::AppState;

pub const SERVICE_NAME: &str = "docgate";

#[derive(Serialize)]
pub struct ParserInfo {
    pub default_parser: ParserKind,
    pub fallback_parser: Option<ParserKind>,
    pub available: [ParserKind; 2],
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub port: u16,
    pub storage: String,
    pub backend_ready: bool,
    pub circuit_breaker: BreakerStatus,
    pub jobs: QueueStatus,
    pub hash_store: StoreStats,
    pub capacity: CapacityPlan,
    pub parser: ParserInfo,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub circuit_breaker: BreakerStatus,
    pub jobs: QueueStatus,
    pub backend_ready: bool,
}

#[derive(Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: &'static str,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let hash_store = state.processed_store.stats().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Hash store stats unavailable");
        StoreStats::default()
    });

    let settings = &state.settings;
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        port: settings.server.port,
        storage: settings.storage.storage_dir.display().to_string(),
        backend_ready: state.backend_ready(),
        circuit_breaker: state.circuit_breaker.status(),
        jobs: state.job_queue.status(),
        hash_store,
        capacity: CapacityPlan::clone(&state.capacity),
        parser: ParserInfo {
            default_parser: settings.processing.default_parser,
            fallback_parser: settings.processing.fallback_parser,
            available: ParserKind::ALL,
        },
    })
}

pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        circuit_breaker: state.circuit_breaker.status(),
        jobs: state.job_queue.status(),
        backend_ready: state.backend_ready(),
    })
}

pub async fn reset_circuit_breaker_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    state.circuit_breaker.reset();
    tracing::info!("Circuit breaker reset by operator");
    Json(ResetResponse {
        success: true,
        message: "Circuit breaker reset",
    })
}
