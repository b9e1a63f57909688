use std::path::PathBuf;

use docgate::domain::{
    Job, JobId, JobOutcome, JobStatus, PROGRESS_CLAIMED, PROGRESS_DONE, PROGRESS_QUEUED,
    ParserKind, TargetId,
};

fn new_job() -> Job {
    Job::new(
        TargetId::new("arxiv:2401.00001"),
        PathBuf::from("/data/paper.pdf"),
        None,
        None,
        false,
    )
}

fn outcome() -> JobOutcome {
    JobOutcome {
        indexed: true,
        output_dir: "/workspace/out/2401.00001".to_string(),
        parser: ParserKind::Mineru,
        markdown_length: Some(42),
        content_hash: Some("abcdef012345".to_string()),
        skipped: false,
        reason: None,
    }
}

#[test]
fn given_new_job_when_created_then_is_queued_with_zero_progress() {
    let job = new_job();

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.progress, PROGRESS_QUEUED);
    assert!(job.started_at.is_none());
    assert!(job.result.is_none() && job.error.is_none());
}

#[test]
fn given_two_jobs_when_created_then_ids_are_short_and_distinct() {
    let a = JobId::new();
    let b = JobId::new();

    assert_eq!(a.as_str().len(), 8);
    assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
}

#[test]
fn given_queued_job_when_marked_processing_then_started_and_progress_advances() {
    let mut job = new_job();

    job.mark_processing().unwrap();

    assert_eq!(job.status, JobStatus::Processing);
    assert!(job.started_at.is_some());
    assert_eq!(job.progress, PROGRESS_CLAIMED);
}

#[test]
fn given_processing_job_when_completed_then_result_set_and_error_clear() {
    let mut job = new_job();
    job.mark_processing().unwrap();

    job.mark_completed(outcome()).unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, PROGRESS_DONE);
    assert!(job.result.is_some());
    assert!(job.error.is_none());
    assert!(job.completed_at >= job.started_at);
}

#[test]
fn given_processing_job_when_failed_then_error_set_and_result_clear() {
    let mut job = new_job();
    job.mark_processing().unwrap();

    job.mark_failed("Processing timeout (5s)").unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.error.as_deref(), Some("Processing timeout (5s)"));
    assert!(job.result.is_none());
}

#[test]
fn given_queued_job_when_completed_directly_then_transition_is_rejected() {
    let mut job = new_job();

    let err = job.mark_completed(outcome()).unwrap_err();

    assert_eq!(err.from, JobStatus::Queued);
    assert_eq!(err.to, JobStatus::Completed);
    assert_eq!(job.status, JobStatus::Queued);
}

#[test]
fn given_completed_job_when_processing_again_then_transition_is_rejected() {
    let mut job = new_job();
    job.mark_processing().unwrap();
    job.mark_completed(outcome()).unwrap();

    assert!(job.mark_processing().is_err());
    assert!(job.mark_failed("late").is_err());
    assert_eq!(job.status, JobStatus::Completed);
}

#[test]
fn given_progress_when_advanced_backwards_then_it_stays() {
    let mut job = new_job();
    job.advance_progress(50);
    job.advance_progress(20);
    assert_eq!(job.progress, 50);

    job.advance_progress(250);
    assert_eq!(job.progress, PROGRESS_DONE);
}

#[test]
fn given_job_with_webhook_when_viewed_then_hides_input_path_and_pinned_ip() {
    let mut job = new_job();
    job.webhook = Some(docgate::domain::WebhookTarget {
        url: "https://hooks.example.com/cb?token=secret".to_string(),
        host: "hooks.example.com".to_string(),
        pinned_ip: Some("93.184.216.34".parse().unwrap()),
    });

    let json = serde_json::to_value(job.view()).unwrap();

    assert_eq!(json["status"], "queued");
    assert_eq!(json["target_id"], "arxiv:2401.00001");
    assert_eq!(json["webhook_configured"], true);
    let rendered = json.to_string();
    assert!(!rendered.contains("paper.pdf"));
    assert!(!rendered.contains("93.184.216.34"));
    assert!(!rendered.contains("secret"));
}

#[test]
fn given_status_strings_when_parsed_then_round_trip_through_display() {
    for status in [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ] {
        let parsed: JobStatus = status.to_string().parse().unwrap();
        assert_eq!(parsed, status);
    }
}

#[test]
fn given_statuses_when_checking_activity_then_only_queued_and_processing_are_active() {
    assert!(JobStatus::Queued.is_active());
    assert!(JobStatus::Processing.is_active());
    assert!(!JobStatus::Completed.is_active());
    assert!(JobStatus::Failed.is_terminal());
}
