//! Concierge CLI and REST API entry point.
//!
//! Binary name: `concierge`
//!
//! Parses CLI arguments, initializes the database and services, then either
//! starts the REST API server or runs a one-shot maintenance command.

mod http;
mod state;

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "concierge", about = "Conversational support backend", version)]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Delete conversation turns older than the given number of days
    Purge {
        /// Age threshold in days
        #[arg(long)]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "info,concierge=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { host, port } => {
            serve(state, host, port).await?;
        }

        Commands::Purge { days } => {
            let removed = state.chat_service.purge_older_than(days).await?;
            println!("Purged {removed} turn(s) older than {days} day(s).");
        }
    }

    Ok(())
}

async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Concierge API listening");

    spawn_maintenance(state.clone());

    let router = http::router::build_router(state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Background maintenance while serving: sweep stale rate-limit windows
/// hourly, and purge turns past the retention age daily when retention is
/// enabled. Failures are logged and retried on the next tick.
fn spawn_maintenance(state: AppState) {
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        interval.tick().await;
        loop {
            interval.tick().await;
            limiter.sweep();
        }
    });

    let retention_days = state.config.retention.days;
    if retention_days == 0 {
        return;
    }
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 3600));
        loop {
            interval.tick().await;
            match state.chat_service.purge_older_than(retention_days).await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, retention_days, "retention sweep removed old turns");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "retention sweep failed");
                }
            }
        }
    });
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
