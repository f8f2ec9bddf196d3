use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boltzq_api::config::ServerConfig;
use boltzq_api::router::build_app_router;
use boltzq_api::state::AppState;
use boltzq_db::PgJobStore;
use boltzq_worker::config::ExecutorConfig;
use boltzq_worker::dispatcher::Dispatcher;
use boltzq_worker::executor::JobExecutor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "boltzq_api=debug,boltzq_worker=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let executor_config = Arc::new(ExecutorConfig::from_env());
    tracing::info!(
        host = %config.host,
        port = %config.port,
        workers = executor_config.worker_count,
        tool = %executor_config.tool_bin,
        "Loaded configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = boltzq_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    boltzq_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    boltzq_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store: Arc<dyn boltzq_db::JobStore> = Arc::new(PgJobStore::new(pool));

    // --- Dispatcher and worker pool ---
    let (dispatcher, queue) = Dispatcher::channel();
    let executor = Arc::new(JobExecutor::new(
        Arc::clone(&store),
        Arc::clone(&executor_config),
    ));
    let shutdown = CancellationToken::new();
    let worker_handles =
        queue.spawn_workers(executor_config.worker_count, executor, shutdown.clone());
    tracing::info!(count = executor_config.worker_count, "Worker pool started");

    // --- App state ---
    let state = AppState {
        store,
        dispatcher,
        config: Arc::new(config.clone()),
    };

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid HOST/PORT combination");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("Server error");

    // Let workers finish the jobs they already picked up.
    tracing::info!("Waiting for workers to drain");
    for handle in worker_handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Worker task ended abnormally");
        }
    }
    tracing::info!("Shutdown complete");
}

/// Resolve on ctrl-c and cancel the worker pool so idle workers stop
/// pulling new jobs.
async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
