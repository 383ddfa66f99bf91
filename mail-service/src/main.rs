//! Mail Service - HTTP entry point.
//!
//! Loads configuration from the environment (exiting non-zero if anything
//! required is missing), then serves the health and send-mail routes until
//! SIGINT/SIGTERM.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{error, info};

use mail_service::shutdown;
use mail_service::telemetry::{self, LogFormat};
use mail_service::{router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init(LogFormat::from_env());

    info!("mail_service_starting");

    // Load configuration; nothing is bound until this succeeds
    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "config_invalid");
        e
    })?;
    info!(
        port = config.port,
        sender = %config.sender,
        sendgrid_api_url = %config.sendgrid_api_url,
        sendgrid_timeout_ms = config.sendgrid_timeout.as_millis() as u64,
        strict_validation = config.strict_validation,
        "config_loaded"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState::new(config).context("Failed to build SendGrid client")?;
    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "mail_service_listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::wait())
    .await
    .context("Server error")?;

    info!("mail_service_shutdown_complete");

    Ok(())
}
