//! echonova-api - music streaming REST backend
//!
//! Configuration priority: command line, then `ECHONOVA_*` environment,
//! then the TOML config file, then compiled defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use echonova_common::config::Config;
use echonova_common::db::init_database;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use echonova_api::services::LogMailer;
use echonova_api::{build_router, AppState};

/// Command-line arguments for echonova-api
#[derive(Parser, Debug)]
#[command(name = "echonova-api")]
#[command(about = "Echonova music streaming backend")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "ECHONOVA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides server.bind_addr)
    #[arg(short, long)]
    bind: Option<String>,

    /// SQLite database file (overrides database.path)
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "echonova_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Echonova API v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(db_path) = args.db_path {
        config.database.path = db_path;
    }

    info!("Database path: {}", config.database.path.display());
    let pool = init_database(&config.database.path)
        .await
        .context("Failed to initialize database")?;

    let mailer = Arc::new(LogMailer::new(&config.mail));
    let bind_addr = config.server.bind_addr.clone();
    let state = AppState::new(pool, config, mailer).context("Failed to build ML client")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("echonova-api listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
