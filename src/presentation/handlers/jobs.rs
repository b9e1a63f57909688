use axum::Json;
use axum::extract::{Path, State};

use crate::application::services::QueueStatus;
use crate::domain::{JobId, JobView};
use crate::presentation::api_error::ApiError;
use crate::presentation::state::AppState;

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, ApiError> {
    state
        .job_queue
        .get_job(&JobId::from_raw(job_id.as_str()))
        .map(|job| Json(job.view()))
        .ok_or_else(|| ApiError::NotFound(format!("Job {job_id} not found")))
}

pub async fn list_jobs_handler(State(state): State<AppState>) -> Json<QueueStatus> {
    Json(state.job_queue.status())
}
