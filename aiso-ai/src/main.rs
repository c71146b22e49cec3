//! aiso-ai - AI sample organizer service
//!
//! Imports audio samples, categorizes and tags them with hosted LLM providers
//! (filename heuristics when none answer), stores them in SQLite and serves
//! the library to the desktop front end over HTTP + SSE.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use aiso_common::config::{
    default_config_path, load_toml_config_or_default, resolve_root_folder, DataPaths,
    ROOT_FOLDER_ENV,
};
use aiso_common::events::EventBus;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aiso_ai::config::{resolve_credentials, ServiceSettings};
use aiso_ai::services::AiService;
use aiso_ai::AppState;

const DEFAULT_PORT: u16 = 5730;

/// Command-line arguments for aiso-ai
#[derive(Parser, Debug)]
#[command(name = "aiso-ai")]
#[command(about = "AI sample organizer service")]
#[command(version)]
struct Args {
    /// Data folder holding the sample database, setup and custom tag files
    #[arg(short, long)]
    root_folder: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "AISO_PORT")]
    port: Option<u16>,

    /// Service config file (defaults to the OS config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let toml_config = load_toml_config_or_default(config_path.as_deref());

    // RUST_LOG wins over the TOML level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting aiso-ai v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &toml_config);
    let data_paths = DataPaths::new(root_folder);
    if let Err(e) = data_paths.ensure_directory_exists() {
        tracing::warn!(error = %e, root = %data_paths.root().display(), "Root folder not created");
    }
    info!("Root folder: {}", data_paths.root().display());

    let opened = aiso_ai::db::open_store(&data_paths.database_path()).await;

    let settings = ServiceSettings::from_toml(&toml_config);
    let ai = Arc::new(AiService::new(Arc::clone(&opened.store), settings));
    let status = ai.initialize(&resolve_credentials(&toml_config));
    info!(
        openai = status.openai,
        anthropic = status.anthropic,
        storage = ?status.storage,
        "AI service ready"
    );

    let event_bus = EventBus::new(100);
    let state = AppState::new(opened, ai, event_bus, data_paths);
    let app = aiso_ai::build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

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
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
