use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tracing::Instrument;

use super::job_queue::QueueCore;
use super::output_layout::markdown_length;
use crate::application::ports::{BackendError, ProcessRequest, WebhookPayload};
use crate::domain::{ContentHash, Job, JobId, JobOutcome, ParserKind, ProcessedRecord};

const PANIC_MESSAGE: &str = "Internal processing error";

/// One member of the worker pool. Workers share the receiving end of the
/// queue channel; whichever is idle takes the next job id.
pub(crate) struct JobWorker {
    index: usize,
    receiver: Arc<Mutex<mpsc::Receiver<JobId>>>,
    core: Arc<QueueCore>,
}

impl JobWorker {
    pub(crate) fn new(
        index: usize,
        receiver: Arc<Mutex<mpsc::Receiver<JobId>>>,
        core: Arc<QueueCore>,
    ) -> Self {
        Self {
            index,
            receiver,
            core,
        }
    }

    pub(crate) async fn run(self) {
        tracing::info!(worker = self.index, "Job worker started");
        loop {
            let next = self.receiver.lock().await.recv().await;
            let Some(job_id) = next else {
                break;
            };
            self.handle(job_id).await;
        }
        tracing::info!(worker = self.index, "Job worker stopped: channel closed");
    }

    async fn handle(&self, job_id: JobId) {
        let Some(job) = self.core.claim(&job_id) else {
            tracing::warn!(job_id = %job_id, "Queued job vanished before it was claimed");
            return;
        };

        let span = tracing::info_span!(
            "document_job",
            job_id = %job.id,
            target_id = %job.target_id,
            worker = self.index,
        );
        self.handle_claimed(job).instrument(span).await;
    }

    async fn handle_claimed(&self, job: Job) {
        tracing::info!("Job processing started");

        let outcome = match AssertUnwindSafe(self.execute(&job)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!("Job panicked inside the worker");
                Err(PANIC_MESSAGE.to_string())
            }
        };

        let breaker = &self.core.deps.circuit_breaker;
        match &outcome {
            Ok(result) => {
                breaker.record_success();
                tracing::info!(skipped = result.skipped, parser = %result.parser, "Job completed");
            }
            Err(error) => {
                breaker.record_failure();
                tracing::error!(error = %error, "Job failed");
            }
        }

        let finished = self.core.finish(&job.id, outcome);

        if let Some(finished) = finished {
            self.deliver_webhook(&finished).await;
        }

        self.core.retire(&job.id);
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome, String> {
        let hash = hash_input(&job.input_path).await?;

        if !job.force_reprocess {
            match self.core.deps.processed_store.find(&hash).await {
                Ok(Some(record)) => {
                    tracing::info!(
                        content_hash = %hash.short(),
                        previous_target = %record.target_id,
                        "Duplicate content, skipping backend"
                    );
                    return Ok(self.skipped_outcome(&hash, &record));
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "Processed store lookup failed"),
            }
        }

        let layout = &self.core.deps.output_layout;
        let output_dir = layout.output_dir(&job.target_id);
        tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
            tracing::error!(error = %e, path = %output_dir.display(), "Cannot create output directory");
            "Failed to prepare output directory".to_string()
        })?;

        let primary = job.forced_parser.unwrap_or(self.core.config.default_parser);
        let parser = self.run_backend(job, primary, &output_dir).await?;

        let markdown_length = {
            let dir = output_dir.clone();
            match tokio::task::spawn_blocking(move || markdown_length(&dir)).await {
                Ok(Ok(len)) => Some(len),
                _ => None,
            }
        };

        let record = ProcessedRecord::new(
            job.target_id.clone(),
            output_dir.to_string_lossy().into_owned(),
            parser,
        );
        if let Err(e) = self.core.deps.processed_store.mark_processed(&hash, record).await {
            tracing::warn!(error = %e, "Could not record processed hash");
        }

        Ok(JobOutcome {
            indexed: true,
            output_dir: layout.display_path(&output_dir),
            parser,
            markdown_length,
            content_hash: Some(hash.short().to_string()),
            skipped: false,
            reason: None,
        })
    }

    /// Tries the primary parser, then the fallback once if it differs.
    /// Returns the parser that succeeded.
    async fn run_backend(
        &self,
        job: &Job,
        primary: ParserKind,
        output_dir: &Path,
    ) -> Result<ParserKind, String> {
        let mut attempts = vec![primary];
        if let Some(fallback) = self.core.config.fallback_parser
            && fallback != primary
        {
            attempts.push(fallback);
        }

        let timeout = self.core.config.process_timeout;
        let mut last_error = String::new();

        for (attempt, parser) in attempts.iter().copied().enumerate() {
            let request = ProcessRequest {
                target_id: job.target_id.clone(),
                file_path: job.input_path.clone(),
                output_dir: output_dir.to_path_buf(),
                parser,
            };

            tracing::info!(parser = %parser, attempt = attempt + 1, "Calling document backend");
            let result = tokio::time::timeout(timeout, self.core.deps.backend.process(&request)).await;

            last_error = match result {
                Ok(Ok(())) => return Ok(parser),
                Ok(Err(e)) => describe_backend_error(&e),
                Err(_) => format!("Processing timeout ({}s)", timeout.as_secs()),
            };

            if attempt + 1 < attempts.len() {
                tracing::warn!(parser = %parser, error = %last_error, "Parser failed, trying fallback");
            }
        }

        Err(last_error)
    }

    fn skipped_outcome(&self, hash: &ContentHash, record: &ProcessedRecord) -> JobOutcome {
        JobOutcome {
            indexed: true,
            output_dir: self
                .core
                .deps
                .output_layout
                .display_path(Path::new(&record.output_dir)),
            parser: record.parser,
            markdown_length: None,
            content_hash: Some(hash.short().to_string()),
            skipped: true,
            reason: Some(format!("Already processed as {}", record.target_id)),
        }
    }

    async fn deliver_webhook(&self, job: &Job) {
        let Some(target) = &job.webhook else {
            return;
        };

        let payload = WebhookPayload::from_job(job);
        match self.core.deps.notifier.notify(target, &payload).await {
            Ok(status) => tracing::info!(status, "Webhook delivered"),
            Err(e) => tracing::warn!(error = %e, "Webhook delivery failed"),
        }
    }
}

async fn hash_input(path: &Path) -> Result<ContentHash, String> {
    let path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || ContentHash::of_file(&path)).await {
        Ok(Ok(hash)) => Ok(hash),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Cannot read input file");
            Err("Failed to read input file".to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Hashing task aborted");
            Err(PANIC_MESSAGE.to_string())
        }
    }
}

/// Backend errors end up in job results and webhooks, so I/O detail that may
/// carry host paths is reduced to a generic message.
fn describe_backend_error(error: &BackendError) -> String {
    match error {
        BackendError::Io(e) => {
            tracing::error!(error = %e, "Backend I/O error");
            "Backend I/O error".to_string()
        }
        other => other.to_string(),
    }
}
