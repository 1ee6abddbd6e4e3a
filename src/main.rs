use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use mayfly::config::Config;
use mayfly::index::IndexManager;
use mayfly::pipeline::{IndexView, UpdatePipeline};
use mayfly::query::QueryExecutor;
use mayfly::ranking::Ranker;
use mayfly::server::routes::build_router;
use mayfly::server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env
    let _ = dotenvy::dotenv();

    // Load config first (needed for logging setup); an optional path comes
    // from the command line.
    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;

    // Initialize tracing from LoggingConfig
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .init();
        }
    }

    tracing::info!("mayfly starting");

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        initial_buckets = config.index.initial_buckets,
        max_size = config.index.max_size,
        apply_interval_secs = config.index.apply_interval_secs,
        update_thread_num = config.pipeline.update_thread_num,
        update_queue_size = config.pipeline.update_queue_size,
        ranking_model = %config.ranking.model,
        "configuration loaded"
    );

    // Initialize metrics
    mayfly::metrics::init();

    // Build the index manager, restoring from the snapshot when configured.
    let manager = if config.index.restore_on_startup {
        tracing::info!(prefix = %config.index.snapshot_prefix, "restoring index from snapshot");
        Arc::new(IndexManager::with_restore(
            config.index.initial_buckets,
            config.index.max_size,
            &config.index.snapshot_prefix,
        ))
    } else {
        Arc::new(IndexManager::new(
            config.index.initial_buckets,
            config.index.max_size,
        ))
    };

    manager.start_maintain(
        Duration::from_secs(config.index.apply_interval_secs),
        Duration::from_secs(config.index.compaction_interval_secs),
    );

    // Update pipeline and ingestion view
    let pipeline = Arc::new(UpdatePipeline::start(
        manager.index(),
        config.pipeline.update_thread_num,
        config.pipeline.update_queue_size,
    ));
    let view = Arc::new(IndexView::new(
        pipeline.clone(),
        config.pipeline.default_ttl_secs,
        config.pipeline.max_ttl_secs,
    ));

    // Query executor with the configured ranking model
    let ranker = Ranker::from_config(&config.ranking)?;
    let executor = Arc::new(QueryExecutor::new(manager.index(), ranker));

    // Build application state
    let state = AppState {
        manager: manager.clone(),
        pipeline: pipeline.clone(),
        view,
        executor,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = build_router(state);

    // Bind and serve
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %addr, "listening");

    let listener = TcpListener::bind(&addr).await?;

    let shutdown_signal = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();
        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT"),
            _ = terminate => tracing::info!("received SIGTERM"),
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    tracing::info!("server stopped, shutting down background tasks");

    // Drain in-flight updates, stop the schedule, then publish what the
    // workers drained so a final dump sees it.
    pipeline.stop().await;
    manager.stop_maintain().await;
    let (applied, expired) = manager.apply_now();
    tracing::info!(applied, expired, "final apply complete");

    if config.index.dump_on_exit {
        tracing::info!(prefix = %config.index.snapshot_prefix, "dumping index snapshot");
        if let Err(e) = manager.dump(&config.index.snapshot_prefix) {
            tracing::error!(error = %e, "snapshot dump failed");
        }
    }

    tracing::info!("mayfly shutdown complete");
    Ok(())
}
