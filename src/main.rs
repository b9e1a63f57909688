use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;

use docgate::application::ports::{DocumentBackend, ProcessedStore};
use docgate::infrastructure::backend::{HttpDocumentBackend, MockDocumentBackend};
use docgate::infrastructure::network::{ReqwestWebhookNotifier, TokioHostResolver};
use docgate::infrastructure::observability::{TracingConfig, init_tracing};
use docgate::infrastructure::persistence::{InMemoryProcessedStore, JsonProcessedStore};
use docgate::infrastructure::system::CapacityPlan;
use docgate::presentation::{AppDependencies, AppState, Environment, Settings, create_router};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(&TracingConfig::default(), settings.server.port);

    let capacity = CapacityPlan::from_env();
    tracing::info!(
        effective_cpus = capacity.cpu.effective_cpu_count,
        cpu_source = %capacity.cpu.effective_cpu_source,
        workers = capacity.max_concurrent_jobs,
        workers_source = %capacity.max_concurrent_jobs_source,
        queue_depth = capacity.max_queue_depth,
        queue_source = %capacity.max_queue_depth_source,
        "Capacity resolved"
    );

    // SAFETY: no other thread exists yet; the runtime is built below.
    unsafe { capacity.thread_tuning.apply() };
    tracing::info!(
        enabled = capacity.thread_tuning.enabled,
        source = %capacity.thread_tuning.source,
        threads = capacity.thread_tuning.recommended_threads,
        applied = capacity.thread_tuning.applied_env.len(),
        preserved = capacity.thread_tuning.preserved_env.len(),
        "Thread tuning applied"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(serve(settings, capacity))
}

async fn serve(settings: Settings, capacity: CapacityPlan) -> anyhow::Result<()> {
    let (backend, processed_store): (Arc<dyn DocumentBackend>, Arc<dyn ProcessedStore>) =
        if settings.scaffold.enabled {
            tracing::warn!("Scaffold mode: using mock engine and in-memory hash store");
            (
                Arc::new(MockDocumentBackend::with_delay(Duration::from_millis(
                    settings.scaffold.mock_delay_ms,
                ))),
                Arc::new(InMemoryProcessedStore::new()),
            )
        } else {
            let backend = HttpDocumentBackend::new(
                &settings.backend.url,
                settings.backend.api_key.clone(),
                Duration::from_secs(settings.backend.query_timeout_secs),
            )
            .context("Failed to create engine client")?;
            let store = JsonProcessedStore::open(settings.storage.hash_store_path())
                .await
                .context("Failed to open processed hash store")?;
            (Arc::new(backend), Arc::new(store))
        };

    tokio::fs::create_dir_all(&settings.storage.output_base)
        .await
        .context("Failed to create output directory")?;

    let notifier = Arc::new(ReqwestWebhookNotifier::new(Duration::from_secs(
        settings.webhook.timeout_secs,
    )));

    if settings.auth.key().is_none() {
        tracing::warn!("No API key configured; authentication disabled");
    }

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server host or port")?;

    let state = AppState::build(
        settings,
        capacity,
        AppDependencies {
            backend: Arc::clone(&backend),
            processed_store,
            resolver: Arc::new(TokioHostResolver),
            notifier,
        },
    );

    let warm_state = state.clone();
    tokio::spawn(async move {
        match backend.warm_up().await {
            Ok(()) => {
                warm_state.mark_backend_ready();
                tracing::info!("Document engine ready");
            }
            Err(e) => tracing::warn!(error = %e, "Document engine warm-up failed"),
        }
    });

    let router = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
