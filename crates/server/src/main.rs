use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use anisync_core::{default_data_dir, Daemon};
use anisync_server::{api::create_router, state::AppState};

/// Setting this to `json` switches log output to JSON lines.
const LOG_FORMAT_ENV: &str = "ANISYNC_LOG_FORMAT";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run() -> Result<()> {
    init_logging();

    let data_dir = default_data_dir().context("Could not determine the data directory")?;
    info!("Using data directory {:?}", data_dir);

    let daemon = Arc::new(
        Daemon::open(&data_dir)
            .with_context(|| format!("Failed to open daemon in {:?}", data_dir))?,
    );
    let config = daemon.config().context("Failed to load configuration")?;

    if !config.is_complete() {
        warn!("Configuration incomplete: set tracker_user and save_path via PUT /api/v1/config");
    }

    daemon
        .start_loop()
        .await
        .context("Failed to start reconciliation loop")?;
    info!(
        interval_minutes = config.check_interval_minutes,
        "Reconciliation loop started"
    );

    let app = create_router(Arc::new(AppState::new(Arc::clone(&daemon))));

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    daemon.shutdown().await;
    info!("Reconciliation loop stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
