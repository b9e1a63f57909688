use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docgate::application::ports::{
    BackendError, DocumentBackend, ProcessRequest, QueryRequest, WebhookError, WebhookNotifier,
    WebhookPayload,
};
use docgate::application::services::{
    BreakerState, CircuitBreaker, JobQueue, JobQueueConfig, JobQueueDeps, JobQueueError,
    JobSubmission, OutputLayout, PathTranslator,
};
use docgate::domain::{Job, JobId, JobStatus, ParserKind, TargetId, WebhookTarget};
use docgate::infrastructure::persistence::InMemoryProcessedStore;

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    Hang,
    Panic,
}

struct ScriptedBackend {
    mineru: Behavior,
    docling: Behavior,
    calls: Mutex<Vec<ParserKind>>,
}

impl ScriptedBackend {
    fn new(mineru: Behavior, docling: Behavior) -> Arc<Self> {
        Arc::new(Self {
            mineru,
            docling,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<ParserKind> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentBackend for ScriptedBackend {
    async fn process(&self, request: &ProcessRequest) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(request.parser);
        let behavior = match request.parser {
            ParserKind::Mineru => self.mineru,
            ParserKind::Docling => self.docling,
        };
        match behavior {
            Behavior::Succeed => {
                let file = request.output_dir.join("out.md");
                tokio::fs::write(&file, "# parsed\n").await?;
                Ok(())
            }
            Behavior::Fail => Err(BackendError::ProcessingFailed(format!(
                "{} could not parse",
                request.parser
            ))),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Behavior::Panic => panic!("engine crashed"),
        }
    }

    async fn query(&self, _request: &QueryRequest) -> Result<serde_json::Value, BackendError> {
        Ok(serde_json::Value::Null)
    }
}

#[derive(Default)]
struct RecordingNotifier {
    payloads: Mutex<Vec<WebhookPayload>>,
    calls: AtomicUsize,
}

#[async_trait]
impl WebhookNotifier for RecordingNotifier {
    async fn notify(
        &self,
        _target: &WebhookTarget,
        payload: &WebhookPayload,
    ) -> Result<u16, WebhookError> {
        self.payloads.lock().unwrap().push(payload.clone());
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(200)
    }
}

struct Harness {
    queue: JobQueue,
    backend: Arc<ScriptedBackend>,
    notifier: Arc<RecordingNotifier>,
    breaker: Arc<CircuitBreaker>,
    inputs: tempfile::TempDir,
    _output: tempfile::TempDir,
}

impl Harness {
    fn start(backend: Arc<ScriptedBackend>, tweak: impl FnOnce(&mut JobQueueConfig)) -> Self {
        let output = tempfile::tempdir().unwrap();
        let inputs = tempfile::tempdir().unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let breaker = Arc::new(CircuitBreaker::new(3, Duration::from_secs(300)));

        let mut config = JobQueueConfig {
            worker_count: 1,
            max_queue_depth: 4,
            history_limit: 100,
            process_timeout: Duration::from_secs(30),
            default_parser: ParserKind::Mineru,
            fallback_parser: Some(ParserKind::Docling),
        };
        tweak(&mut config);

        let deps = JobQueueDeps {
            backend: Arc::clone(&backend) as Arc<dyn DocumentBackend>,
            processed_store: Arc::new(InMemoryProcessedStore::new()),
            notifier: Arc::clone(&notifier) as Arc<dyn WebhookNotifier>,
            circuit_breaker: Arc::clone(&breaker),
            output_layout: Arc::new(OutputLayout::new(
                output.path().to_path_buf(),
                PathTranslator::default(),
            )),
        };

        Self {
            queue: JobQueue::start(config, deps),
            backend,
            notifier,
            breaker,
            inputs,
            _output: output,
        }
    }

    fn input(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.inputs.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn submit(&self, target: &str, input: &Path) -> Job {
        self.queue.submit(submission(target, input)).unwrap()
    }

    async fn wait_terminal(&self, id: &JobId) -> Job {
        let poll = async {
            loop {
                if let Some(job) = self.queue.get_job(id)
                    && job.status.is_terminal()
                {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), poll)
            .await
            .expect("job did not finish in time")
    }
}

fn submission(target: &str, input: &Path) -> JobSubmission {
    JobSubmission {
        target_id: TargetId::new(target),
        input_path: input.to_path_buf(),
        webhook: None,
        forced_parser: None,
        force_reprocess: false,
    }
}

fn webhook() -> WebhookTarget {
    WebhookTarget {
        url: "https://hooks.example.com/done".to_string(),
        host: "hooks.example.com".to_string(),
        pinned_ip: Some("93.184.216.34".parse().unwrap()),
    }
}

#[tokio::test]
async fn given_submitted_job_when_backend_succeeds_then_completed_with_outcome() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Succeed, Behavior::Succeed), |_| {});
    let input = h.input("a.pdf", b"document a");

    let queued = h.submit("paper-a", &input);
    assert_eq!(queued.status, JobStatus::Queued);
    assert_eq!(queued.id.as_str().len(), 8);

    let job = h.wait_terminal(&queued.id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100);
    assert!(job.started_at.is_some());
    assert!(job.completed_at >= job.started_at);
    let result = job.result.unwrap();
    assert!(result.indexed);
    assert!(!result.skipped);
    assert_eq!(result.parser, ParserKind::Mineru);
    assert_eq!(result.markdown_length, Some("# parsed\n".len() as u64));
    assert_eq!(result.content_hash.as_deref().map(str::len), Some(12));
    assert!(result.output_dir.ends_with("paper-a"));
    assert_eq!(h.backend.calls(), vec![ParserKind::Mineru]);
    assert_eq!(h.breaker.state(), BreakerState::Closed);
}

#[tokio::test]
async fn given_same_content_under_new_target_when_processed_then_skipped_without_backend() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Succeed, Behavior::Succeed), |_| {});
    let first = h.input("first.pdf", b"identical bytes");
    let second = h.input("second.pdf", b"identical bytes");

    let original = h.submit("original", &first);
    h.wait_terminal(&original.id).await;
    let duplicate = h.submit("duplicate", &second);
    let job = h.wait_terminal(&duplicate.id).await;

    assert_eq!(job.status, JobStatus::Completed);
    let result = job.result.unwrap();
    assert!(result.skipped);
    assert_eq!(result.reason.as_deref(), Some("Already processed as original"));
    assert!(result.output_dir.ends_with("original"));
    assert_eq!(h.backend.calls().len(), 1);
}

#[tokio::test]
async fn given_force_reprocess_when_content_known_then_backend_runs_again() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Succeed, Behavior::Succeed), |_| {});
    let input = h.input("doc.pdf", b"same");

    let first = h.submit("doc", &input);
    h.wait_terminal(&first.id).await;
    let forced = h
        .queue
        .submit(JobSubmission {
            force_reprocess: true,
            ..submission("doc", &input)
        })
        .unwrap();
    let job = h.wait_terminal(&forced.id).await;

    assert!(!job.result.unwrap().skipped);
    assert_eq!(h.backend.calls().len(), 2);
}

#[tokio::test]
async fn given_primary_parser_fails_when_fallback_succeeds_then_completed_with_fallback() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Fail, Behavior::Succeed), |_| {});
    let input = h.input("b.pdf", b"document b");

    let job = h.submit("paper-b", &input);
    let job = h.wait_terminal(&job.id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result.unwrap().parser, ParserKind::Docling);
    assert_eq!(h.backend.calls(), vec![ParserKind::Mineru, ParserKind::Docling]);
}

#[tokio::test]
async fn given_forced_parser_equal_to_fallback_when_it_fails_then_not_retried() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Succeed, Behavior::Fail), |_| {});
    let input = h.input("c.pdf", b"document c");

    let job = h
        .queue
        .submit(JobSubmission {
            forced_parser: Some(ParserKind::Docling),
            ..submission("paper-c", &input)
        })
        .unwrap();
    let job = h.wait_terminal(&job.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(h.backend.calls(), vec![ParserKind::Docling]);
}

#[tokio::test]
async fn given_all_parsers_fail_when_processed_then_failed_and_breaker_counts_it() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Fail, Behavior::Fail), |_| {});
    let input = h.input("d.pdf", b"document d");

    let job = h.submit("paper-d", &input);
    let job = h.wait_terminal(&job.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.result.is_none());
    assert!(job.error.unwrap().contains("docling could not parse"));
    assert_eq!(h.breaker.status().recent_failures, 1);
}

#[tokio::test]
async fn given_backend_exceeds_timeout_when_processed_then_failed_with_timeout_message() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Hang, Behavior::Hang), |config| {
        config.process_timeout = Duration::from_millis(50);
        config.fallback_parser = None;
    });
    let input = h.input("e.pdf", b"document e");

    let job = h.submit("paper-e", &input);
    let job = h.wait_terminal(&job.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().starts_with("Processing timeout"));
}

#[tokio::test]
async fn given_backend_panics_when_processed_then_failed_and_worker_survives() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Panic, Behavior::Panic), |config| {
        config.fallback_parser = None;
    });
    let input = h.input("f.pdf", b"document f");

    let crashed = h.submit("paper-f", &input);
    let crashed = h.wait_terminal(&crashed.id).await;

    assert_eq!(crashed.status, JobStatus::Failed);
    assert_eq!(crashed.error.as_deref(), Some("Internal processing error"));

    let again = h.submit("paper-f2", &h.input("g.pdf", b"document g"));
    let again = h.wait_terminal(&again.id).await;
    assert_eq!(again.status, JobStatus::Failed);
}

#[tokio::test]
async fn given_unreadable_input_when_processed_then_failed_without_backend_call() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Succeed, Behavior::Succeed), |_| {});
    let missing = h.inputs.path().join("gone.pdf");

    let job = h.submit("paper-gone", &missing);
    let job = h.wait_terminal(&job.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("Failed to read input file"));
    assert!(h.backend.calls().is_empty());
}

#[tokio::test]
async fn given_queue_at_capacity_when_submitting_then_rejected_as_full() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Hang, Behavior::Hang), |config| {
        config.worker_count = 1;
        config.max_queue_depth = 1;
    });
    let input = h.input("h.pdf", b"document h");

    assert_eq!(h.queue.capacity(), 2);
    h.submit("one", &input);
    h.submit("two", &input);

    assert!(!h.queue.can_accept());
    let err = h.queue.submit(submission("three", &input)).unwrap_err();
    assert!(matches!(err, JobQueueError::Full { capacity: 2 }));
    assert_eq!(h.queue.status().active_jobs, 2);
}

#[tokio::test]
async fn given_webhook_when_job_finishes_then_notified_once_with_terminal_status() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Succeed, Behavior::Succeed), |_| {});
    let input = h.input("i.pdf", b"document i");

    let job = h
        .queue
        .submit(JobSubmission {
            webhook: Some(webhook()),
            ..submission("paper-i", &input)
        })
        .unwrap();
    h.wait_terminal(&job.id).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.notifier.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let payloads = h.notifier.payloads.lock().unwrap().clone();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].job_id, job.id.to_string());
    assert_eq!(payloads[0].target_id, "paper-i");
    assert_eq!(payloads[0].status, "completed");
    assert!(payloads[0].result.is_some());
    assert!(payloads[0].error.is_none());
}

#[tokio::test]
async fn given_history_limit_when_more_jobs_finish_then_oldest_is_forgotten() {
    let h = Harness::start(ScriptedBackend::new(Behavior::Succeed, Behavior::Succeed), |config| {
        config.history_limit = 2;
    });

    let mut ids = Vec::new();
    for n in 0..3 {
        let input = h.input(&format!("{n}.pdf"), format!("content {n}").as_bytes());
        let job = h.submit(&format!("paper-{n}"), &input);
        h.wait_terminal(&job.id).await;
        ids.push(job.id);
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.queue.status().completed_in_history < 2 || !h.queue.status().jobs.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    assert!(h.queue.get_job(&ids[0]).is_none());
    assert!(h.queue.get_job(&ids[1]).is_some());
    assert!(h.queue.get_job(&ids[2]).is_some());
    assert!(h.queue.get_job(&JobId::from_raw("deadbeef")).is_none());
}
