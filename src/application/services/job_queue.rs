use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use super::job_worker::JobWorker;
use super::{CircuitBreaker, OutputLayout};
use crate::application::ports::{DocumentBackend, ProcessedStore, WebhookNotifier};
use crate::domain::{Job, JobId, JobOutcome, JobView, ParserKind, TargetId, WebhookTarget};

#[derive(Debug, Clone)]
pub struct JobQueueConfig {
    pub worker_count: usize,
    pub max_queue_depth: usize,
    pub history_limit: usize,
    pub process_timeout: Duration,
    pub default_parser: ParserKind,
    pub fallback_parser: Option<ParserKind>,
}

impl JobQueueConfig {
    pub fn capacity(&self) -> usize {
        self.worker_count + self.max_queue_depth
    }
}

/// Collaborators every worker needs.
#[derive(Clone)]
pub struct JobQueueDeps {
    pub backend: Arc<dyn DocumentBackend>,
    pub processed_store: Arc<dyn ProcessedStore>,
    pub notifier: Arc<dyn WebhookNotifier>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub output_layout: Arc<OutputLayout>,
}

#[derive(Debug, Clone)]
pub struct JobSubmission {
    pub target_id: TargetId,
    pub input_path: PathBuf,
    pub webhook: Option<WebhookTarget>,
    pub forced_parser: Option<ParserKind>,
    pub force_reprocess: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub active_jobs: usize,
    pub max_workers: usize,
    pub queue_depth: usize,
    pub capacity: usize,
    pub jobs: Vec<JobView>,
    pub completed_in_history: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum JobQueueError {
    #[error("Job queue full ({capacity} active jobs)")]
    Full { capacity: usize },
    #[error("Job queue is shut down")]
    Closed,
}

/// Live jobs plus the bounded history of retired ones. One lock guards both
/// so a job is never visible in neither place.
#[derive(Debug, Default)]
pub(crate) struct JobBook {
    live: HashMap<JobId, Job>,
    history: VecDeque<Job>,
}

impl JobBook {
    fn active_count(&self) -> usize {
        self.live.values().filter(|job| job.status.is_active()).count()
    }
}

pub(crate) struct QueueCore {
    pub(crate) config: JobQueueConfig,
    pub(crate) deps: JobQueueDeps,
    book: Mutex<JobBook>,
}

impl QueueCore {
    fn book(&self) -> std::sync::MutexGuard<'_, JobBook> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves a queued job to processing and hands back a snapshot.
    pub(crate) fn claim(&self, id: &JobId) -> Option<Job> {
        let mut book = self.book();
        let job = book.live.get_mut(id)?;
        if let Err(e) = job.mark_processing() {
            tracing::warn!(error = %e, "Refusing to claim job");
            return None;
        }
        Some(job.clone())
    }

    pub(crate) fn finish(&self, id: &JobId, outcome: Result<JobOutcome, String>) -> Option<Job> {
        let mut book = self.book();
        let job = book.live.get_mut(id)?;
        let transition = match outcome {
            Ok(result) => job.mark_completed(result),
            Err(error) => job.mark_failed(error),
        };
        if let Err(e) = transition {
            tracing::error!(error = %e, "Job finished from an unexpected state");
        }
        Some(job.clone())
    }

    pub(crate) fn retire(&self, id: &JobId) {
        let mut book = self.book();
        let Some(job) = book.live.remove(id) else {
            return;
        };
        book.history.push_back(job);
        while book.history.len() > self.config.history_limit {
            book.history.pop_front();
        }
    }
}

/// Bounded async job queue: a fixed pool of workers drains a channel of job
/// ids, and admission is refused once queued plus processing jobs reach
/// `worker_count + max_queue_depth`.
#[derive(Clone)]
pub struct JobQueue {
    core: Arc<QueueCore>,
    sender: mpsc::Sender<JobId>,
}

impl JobQueue {
    /// Spawns the worker pool on the current tokio runtime.
    pub fn start(config: JobQueueConfig, deps: JobQueueDeps) -> Self {
        let worker_count = config.worker_count.max(1);
        let (sender, receiver) = mpsc::channel(worker_count + config.max_queue_depth);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let core = Arc::new(QueueCore {
            config: JobQueueConfig {
                worker_count,
                ..config
            },
            deps,
            book: Mutex::new(JobBook::default()),
        });

        for index in 0..worker_count {
            let worker = JobWorker::new(index, Arc::clone(&receiver), Arc::clone(&core));
            tokio::spawn(worker.run());
        }

        tracing::info!(
            workers = worker_count,
            queue_depth = core.config.max_queue_depth,
            "Job queue started"
        );

        Self { core, sender }
    }

    pub fn config(&self) -> &JobQueueConfig {
        &self.core.config
    }

    pub fn capacity(&self) -> usize {
        self.core.config.capacity()
    }

    pub fn active_count(&self) -> usize {
        self.core.book().active_count()
    }

    pub fn can_accept(&self) -> bool {
        self.active_count() < self.capacity()
    }

    /// Registers the job and queues it. The capacity check is repeated under
    /// the lock so racing submitters cannot overshoot.
    pub fn submit(&self, submission: JobSubmission) -> Result<Job, JobQueueError> {
        let job = Job::new(
            submission.target_id,
            submission.input_path,
            submission.webhook,
            submission.forced_parser,
            submission.force_reprocess,
        );
        let id = job.id.clone();

        {
            let mut book = self.core.book();
            if book.active_count() >= self.capacity() {
                return Err(JobQueueError::Full {
                    capacity: self.capacity(),
                });
            }
            book.live.insert(id.clone(), job.clone());
        }

        if let Err(e) = self.sender.try_send(id.clone()) {
            self.core.book().live.remove(&id);
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => JobQueueError::Full {
                    capacity: self.capacity(),
                },
                mpsc::error::TrySendError::Closed(_) => JobQueueError::Closed,
            });
        }

        tracing::info!(job_id = %id, target_id = %job.target_id, "Job queued");
        Ok(job)
    }

    pub fn get_job(&self, id: &JobId) -> Option<Job> {
        let book = self.core.book();
        if let Some(job) = book.live.get(id) {
            return Some(job.clone());
        }
        book.history.iter().rev().find(|job| &job.id == id).cloned()
    }

    pub fn status(&self) -> QueueStatus {
        let book = self.core.book();
        let mut jobs: Vec<JobView> = book.live.values().map(Job::view).collect();
        jobs.sort_by_key(|job| job.created_at);

        QueueStatus {
            active_jobs: book.active_count(),
            max_workers: self.core.config.worker_count,
            queue_depth: self.core.config.max_queue_depth,
            capacity: self.capacity(),
            jobs,
            completed_in_history: book.history.len(),
        }
    }
}
