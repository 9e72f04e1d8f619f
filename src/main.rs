//! Home energy service -- meter readings and CSV uploads to S3.
//!
//! Startup is all-or-nothing: configuration, credentials and the storage
//! client are resolved before the listener is bound, and any failure
//! exits the process without serving a single request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use home_energy::config::{self, LoggingConfig};

/// Command-line arguments for the home energy server.
#[derive(Parser, Debug)]
#[command(
    name = "home-energy",
    version,
    about = "Energy reading intake and CSV upload service"
)]
struct Cli {
    /// Path to an optional YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address (host:port).
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env file is fine; the variables may come from the shell.
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    let config = config::load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    if dotenv_loaded {
        info!("Loaded environment from .env");
    }
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path.display());
    }

    if config.observability.metrics {
        home_energy::metrics::init_metrics()?;
        home_energy::metrics::describe_metrics();
        info!("Prometheus metrics initialized");
    }

    let storage = home_energy::storage::from_config(&config.storage).await?;

    let bind_addr = cli.bind.unwrap_or_else(|| config.server.bind_addr());
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    info!(
        max_body_size = config.server.max_body_size,
        upload_timeout_secs = config.storage.upload_timeout_secs,
        "Request limits configured"
    );

    let state = Arc::new(home_energy::AppState { config, storage });
    let app = home_energy::server::app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("home-energy listening on {}", bind_addr);

    // Stop accepting on SIGTERM/SIGINT and let in-flight requests drain,
    // but never wait longer than the configured shutdown timeout.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let mut graceful_rx = shutdown_rx.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = graceful_rx.changed().await;
    });
    let mut server = tokio::spawn(async move { server.await });

    let mut deadline_rx = shutdown_rx;
    let drain_deadline = async move {
        let _ = deadline_rx.changed().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = &mut server => {
            result??;
        }
        _ = drain_deadline => {
            warn!("In-flight requests did not finish within {:?}, exiting", shutdown_timeout);
        }
    }

    info!("home-energy shut down");

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`; `logging.format: json` switches
/// to structured output.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C), then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, shutting down");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        },
    }
}
