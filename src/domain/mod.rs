mod content_hash;
mod job;
mod job_status;
mod parser_kind;
mod processed_record;
mod target_id;
mod webhook_target;

pub use content_hash::ContentHash;
pub use job::{
    Job, JobId, JobOutcome, JobTransitionError, JobView, PROGRESS_CLAIMED, PROGRESS_DONE,
    PROGRESS_QUEUED,
};
pub use job_status::JobStatus;
pub use parser_kind::{ParserKind, UnknownParser};
pub use processed_record::ProcessedRecord;
pub use target_id::TargetId;
pub use webhook_target::WebhookTarget;
