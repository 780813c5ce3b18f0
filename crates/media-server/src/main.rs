//! `media-server` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise tracing.
//! 3. Generate the process certificate and print its PEM for the client to trust.
//! 4. Start the server over an empty in-memory store.
//! 5. Translate signals into lifecycle transitions until asked to exit.

use anyhow::{Context, Result};
use tracing::info;

use media_server::{
    certificate,
    config::Config,
    server::{AppState, MediaServer},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        "media-server starting"
    );

    // -----------------------------------------------------------------------
    // 3. Certificate
    // -----------------------------------------------------------------------
    let pem = certificate::public_pem().context("failed to generate TLS certificate")?;
    print!("{pem}");

    // -----------------------------------------------------------------------
    // 4. HTTPS server
    // -----------------------------------------------------------------------
    let server = MediaServer::new(&cfg, AppState::default())?;
    server.start().await;
    match server.wait_until_running().await {
        Some(port) => info!(port, url = %server.base_url()?, "media-server ready"),
        None => anyhow::bail!("media server could not bind a listener"),
    }

    // -----------------------------------------------------------------------
    // 5. Lifecycle signals
    // -----------------------------------------------------------------------
    run_until_shutdown(&server).await?;
    server.stop().await?;
    info!("media-server exited");

    Ok(())
}

/// SIGUSR1 moves the server to the background, SIGUSR2 back to the
/// foreground. Returns on Ctrl+C or SIGTERM.
#[cfg(unix)]
async fn run_until_shutdown(server: &MediaServer) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut background =
        signal(SignalKind::user_defined1()).context("failed to install SIGUSR1 handler")?;
    let mut foreground =
        signal(SignalKind::user_defined2()).context("failed to install SIGUSR2 handler")?;

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("failed to listen for Ctrl+C")?;
                info!("received Ctrl+C");
                return Ok(());
            }
            _ = terminate.recv() => {
                info!("received SIGTERM");
                return Ok(());
            }
            _ = background.recv() => server.to_background().await,
            _ = foreground.recv() => server.to_foreground().await,
        }
    }
}

#[cfg(not(unix))]
async fn run_until_shutdown(_server: &MediaServer) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C");
    Ok(())
}
