mod circuit_breaker;
mod job_queue;
mod job_worker;
mod output_layout;
mod path_guard;
mod rate_limiter;
mod rejection_kind;
mod webhook_guard;

pub use circuit_breaker::{BreakerState, BreakerStatus, CircuitBreaker, FAILURE_WINDOW};
pub use job_queue::{
    JobQueue, JobQueueConfig, JobQueueDeps, JobQueueError, JobSubmission, QueueStatus,
};
pub use output_layout::{CachedOutput, OutputLayout, markdown_length};
pub use path_guard::{DOCUMENT_EXTENSION, PathGuard, PathGuardError, PathTranslator};
pub use rate_limiter::{DEFAULT_PURGE_THRESHOLD, RateDecision, RateLimiter};
pub use rejection_kind::RejectionKind;
pub use webhook_guard::{
    DEFAULT_MAX_URL_LENGTH, WebhookGuard, WebhookGuardConfig, WebhookGuardError, is_public_ip,
};
