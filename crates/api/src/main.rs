use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shotforge_api::config::ServerConfig;
use shotforge_api::router::build_app_router;
use shotforge_api::state::AppState;
use shotforge_cloud::{AssetFetcher, ObjectStore};
use shotforge_comfyui::{
    ComfyUIApi, CorrelationStore, InFlightCounter, InMemoryCorrelationStore, JobDispatcher,
};
use shotforge_events::EventBus;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shotforge_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = shotforge_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    shotforge_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    shotforge_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Workflow template ---
    let template_path = &config.generation.workflow_template_path;
    let template_text = std::fs::read_to_string(template_path)
        .unwrap_or_else(|e| panic!("Failed to read workflow template '{template_path}': {e}"));
    let template: serde_json::Value = serde_json::from_str(&template_text)
        .unwrap_or_else(|e| panic!("Workflow template '{template_path}' is not valid JSON: {e}"));
    tracing::info!(path = %template_path, "Workflow template loaded");

    // --- Object storage ---
    let store = ObjectStore::connect(config.storage.clone()).await;
    let fetcher = Arc::new(AssetFetcher::new(store));
    tracing::info!(bucket = %config.storage.bucket, "Object store client ready");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    tracing::info!("Event bus created");

    // --- Dispatch pipeline ---
    let correlation: Arc<dyn CorrelationStore> = Arc::new(InMemoryCorrelationStore::new());
    let api = ComfyUIApi::new(config.generation.comfyui_url.clone());
    let dispatcher = Arc::new(JobDispatcher::new(
        api,
        pool.clone(),
        Arc::clone(&correlation),
        Arc::clone(&event_bus),
        InFlightCounter::new(),
    ));
    tracing::info!(comfyui_url = %config.generation.comfyui_url, "Job dispatcher ready");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        template: Arc::new(template),
        dispatcher,
        correlation: Arc::clone(&correlation),
        fetcher,
        event_bus: Arc::clone(&event_bus),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    tokio::select! {
        // The server only finishes on its own when serving failed.
        result = &mut server => {
            result.expect("Server task failed");
            return;
        }
        () = shutdown_signal() => {}
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server draining open connections");

    let _ = shutdown_tx.send(());
    // Lingering WebSocket subscribers would otherwise hold the drain
    // open until every client disconnects on its own.
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, server).await.is_err() {
        tracing::warn!("Connections still open after the drain window, exiting anyway");
    }

    let unclaimed = correlation.len().await;
    if unclaimed > 0 {
        // Their audit rows keep these recoverable after a restart.
        tracing::warn!(unclaimed, "Exiting with dispatched jobs still awaiting results");
    }

    // Drop the event bus sender to close the broadcast channel, which
    // stops the WebSocket forwarding tasks.
    drop(event_bus);

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
