//! Main entry point for the zipstream service.
//!
//! Parses the command line, sets up logging, and serves archives until
//! interrupted with Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use zipstream::Cli;
use zipstream::logging;
use zipstream::server::{self, AppState};

/// Application entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config()?;

    logging::init(config.logging)?;

    let state = AppState::new(&config).with_context(|| {
        format!(
            "failed to open archive directory {}",
            config.archive.base_dir.display()
        )
    })?;

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to listen on {}", config.bind))?;

    tracing::info!(
        address = %config.bind,
        base_dir = %config.archive.base_dir.display(),
        delay = ?config.archive.delay,
        "serving archives"
    );

    server::serve(listener, state, shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

/// Resolve on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
