mod health;
mod jobs;
mod process;
mod query;

pub use health::{
    HealthResponse, SERVICE_NAME, health_handler, reset_circuit_breaker_handler, status_handler,
};
pub use jobs::{job_status_handler, list_jobs_handler};
pub use process::{ProcessRequestBody, process_handler, process_sync_handler};
pub use query::{QUERY_MODES, query_handler};
