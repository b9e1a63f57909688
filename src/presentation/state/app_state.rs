use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::application::ports::{DocumentBackend, HostResolver, ProcessedStore, WebhookNotifier};
use crate::application::services::{
    CircuitBreaker, JobQueue, JobQueueConfig, JobQueueDeps, OutputLayout, PathGuard,
    PathTranslator, RateLimiter, WebhookGuard, WebhookGuardConfig,
};
use crate::infrastructure::system::CapacityPlan;
use crate::presentation::config::Settings;

/// Adapters chosen by the entry point (or a test).
pub struct AppDependencies {
    pub backend: Arc<dyn DocumentBackend>,
    pub processed_store: Arc<dyn ProcessedStore>,
    pub resolver: Arc<dyn HostResolver>,
    pub notifier: Arc<dyn WebhookNotifier>,
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub capacity: Arc<CapacityPlan>,
    pub job_queue: JobQueue,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub rate_limiter: Arc<RateLimiter>,
    pub path_guard: Arc<PathGuard>,
    pub webhook_guard: Arc<WebhookGuard>,
    pub output_layout: Arc<OutputLayout>,
    pub backend: Arc<dyn DocumentBackend>,
    pub processed_store: Arc<dyn ProcessedStore>,
    pub notifier: Arc<dyn WebhookNotifier>,
    backend_ready: Arc<AtomicBool>,
}

impl AppState {
    /// Wires every service from settings. Spawns the worker pool, so it must
    /// run inside a tokio runtime.
    pub fn build(settings: Settings, capacity: CapacityPlan, deps: AppDependencies) -> Self {
        let paths = &settings.paths;
        let translator = PathTranslator::new(
            paths.container_path_prefix.clone(),
            paths.host_path_prefix.clone(),
            PathTranslator::parse_mappings(&paths.mappings),
        );

        let roots: Vec<PathBuf> = if paths.allowed_roots.is_empty() {
            translator
                .host_roots()
                .into_iter()
                .map(PathBuf::from)
                .chain(std::iter::once(settings.storage.data_dir.clone()))
                .collect()
        } else {
            paths.allowed_roots.iter().map(PathBuf::from).collect()
        };
        let path_guard = PathGuard::new(translator.clone(), &roots, paths.allow_unsafe_paths);
        if paths.allow_unsafe_paths {
            tracing::warn!("Input path root enforcement disabled");
        }

        let webhook_guard = WebhookGuard::new(
            WebhookGuardConfig {
                allow_private_hosts: settings.webhook.allow_private_hosts,
                allowed_hosts: settings.webhook.allowed_hosts.clone(),
                max_url_length: settings.webhook.max_url_length,
            },
            deps.resolver,
        );

        let circuit_breaker = Arc::new(CircuitBreaker::new(
            settings.circuit_breaker.failure_threshold,
            Duration::from_secs(settings.circuit_breaker.recovery_timeout_secs),
        ));
        let rate_limiter = RateLimiter::new(
            settings.rate_limit.max_requests,
            Duration::from_secs(settings.rate_limit.window_secs),
        );
        let output_layout = Arc::new(OutputLayout::new(
            settings.storage.output_base.clone(),
            translator,
        ));

        let job_queue = JobQueue::start(
            JobQueueConfig {
                worker_count: capacity.max_concurrent_jobs,
                max_queue_depth: capacity.max_queue_depth,
                history_limit: settings.processing.history_limit,
                process_timeout: settings.processing.timeout(),
                default_parser: settings.processing.default_parser,
                fallback_parser: settings.processing.fallback_parser,
            },
            JobQueueDeps {
                backend: Arc::clone(&deps.backend),
                processed_store: Arc::clone(&deps.processed_store),
                notifier: Arc::clone(&deps.notifier),
                circuit_breaker: Arc::clone(&circuit_breaker),
                output_layout: Arc::clone(&output_layout),
            },
        );

        Self {
            settings: Arc::new(settings),
            capacity: Arc::new(capacity),
            job_queue,
            circuit_breaker,
            rate_limiter: Arc::new(rate_limiter),
            path_guard: Arc::new(path_guard),
            webhook_guard: Arc::new(webhook_guard),
            output_layout,
            backend: deps.backend,
            processed_store: deps.processed_store,
            notifier: deps.notifier,
            backend_ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn backend_ready(&self) -> bool {
        self.backend_ready.load(Ordering::Relaxed)
    }

    pub fn mark_backend_ready(&self) {
        self.backend_ready.store(true, Ordering::Relaxed);
    }
}
