//! gachadiff engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gachadiff_engine::api;
use gachadiff_engine::app::App;
use gachadiff_engine::infrastructure::{
    clock::{SystemClock, SystemRandom},
    config::AppConfig,
    ports::{ClockPort, ImageGenPort},
    profile_store::SqliteProfileRepo,
    stable_diffusion::StableDiffusionClient,
};
use gachadiff_engine::queue::Worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the binary is often run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gachadiff_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gachadiff engine");

    // Bad configuration stops us here, before anything is spawned
    let config = AppConfig::from_env()?;
    tracing::info!(
        backend = %config.backend.base_url,
        depth = config.queue.depth,
        max_guilds = config.queue.max_guilds,
        max_guild_reqs = config.queue.max_guild_reqs,
        "Configuration loaded"
    );

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
    let repo = Arc::new(SqliteProfileRepo::new(&config.database_path, clock.clone()).await?);
    let backend: Arc<dyn ImageGenPort> = Arc::new(StableDiffusionClient::new(&config.backend)?);

    let (app, inbox) = App::new(&config, repo, clock, Arc::new(SystemRandom::new()));
    let app = Arc::new(app);

    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    // Single serial worker
    let worker = Worker::new(inbox, backend, config.queue.cooldown);
    let worker_handle = tokio::spawn(worker.run(cancel_token.clone()));

    let router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server_token = cancel_token.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        server_token.cancelled().await;
        tracing::info!("HTTP server received shutdown signal");
    });

    if let Err(e) = server.await {
        tracing::error!("Server error: {}", e);
    }

    // The server can also stop on its own; make sure the worker follows
    cancel_token.cancel();
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "Worker task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Cancel `cancel_token` on Ctrl+C or SIGTERM.
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        cancel_token.cancel();
    });
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
