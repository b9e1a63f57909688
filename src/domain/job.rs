use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{JobStatus, ParserKind, TargetId, WebhookTarget};

const JOB_ID_LEN: usize = 8;

pub const PROGRESS_QUEUED: u8 = 0;
pub const PROGRESS_CLAIMED: u8 = 10;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(JOB_ID_LEN);
        Self(id)
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Success payload of a finished job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobOutcome {
    pub indexed: bool,
    pub output_dir: String,
    pub parser: ParserKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("job {job_id}: illegal transition {from} -> {to}")]
pub struct JobTransitionError {
    pub job_id: JobId,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Caller-facing snapshot of a job. Leaves out the resolved input path and
/// the pinned webhook address.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: JobId,
    pub target_id: TargetId,
    pub status: JobStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<JobOutcome>,
    pub error: Option<String>,
    pub webhook_configured: bool,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub target_id: TargetId,
    pub input_path: PathBuf,
    pub status: JobStatus,
    pub webhook: Option<WebhookTarget>,
    pub forced_parser: Option<ParserKind>,
    pub force_reprocess: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: u8,
    pub result: Option<JobOutcome>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(
        target_id: TargetId,
        input_path: PathBuf,
        webhook: Option<WebhookTarget>,
        forced_parser: Option<ParserKind>,
        force_reprocess: bool,
    ) -> Self {
        Self {
            id: JobId::new(),
            target_id,
            input_path,
            status: JobStatus::Queued,
            webhook,
            forced_parser,
            force_reprocess,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress: PROGRESS_QUEUED,
            result: None,
            error: None,
        }
    }

    pub fn view(&self) -> JobView {
        JobView {
            job_id: self.id.clone(),
            target_id: self.target_id.clone(),
            status: self.status,
            progress: self.progress,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            result: self.result.clone(),
            error: self.error.clone(),
            webhook_configured: self.webhook.is_some(),
        }
    }

    pub fn mark_processing(&mut self) -> Result<(), JobTransitionError> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(Utc::now());
        self.advance_progress(PROGRESS_CLAIMED);
        Ok(())
    }

    pub fn mark_completed(&mut self, outcome: JobOutcome) -> Result<(), JobTransitionError> {
        self.transition(JobStatus::Completed)?;
        self.result = Some(outcome);
        self.error = None;
        self.finish();
        Ok(())
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), JobTransitionError> {
        self.transition(JobStatus::Failed)?;
        self.error = Some(error.into());
        self.result = None;
        self.finish();
        Ok(())
    }

    /// Progress never moves backwards.
    pub fn advance_progress(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(PROGRESS_DONE));
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), JobTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(JobTransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    fn finish(&mut self) {
        let now = Utc::now();
        self.completed_at = Some(match self.started_at {
            Some(started) if started > now => started,
            _ => now,
        });
        self.advance_progress(PROGRESS_DONE);
    }
}
