//! Shutdown signal handling.

use std::future::{pending, Future};

use tracing::{error, info};

/// Signal that stopped the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupt,
    Terminate,
}

impl Shutdown {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shutdown::Interrupt => "SIGINT",
            Shutdown::Terminate => "SIGTERM",
        }
    }
}

/// Resolve with whichever signal future finishes first.
pub async fn first_of<I, T>(interrupt: I, terminate: T) -> Shutdown
where
    I: Future<Output = ()>,
    T: Future<Output = ()>,
{
    tokio::select! {
        _ = interrupt => Shutdown::Interrupt,
        _ = terminate => Shutdown::Terminate,
    }
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "sigint_handler_failed");
        pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!(error = %e, "sigterm_handler_failed");
            pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    pending::<()>().await;
}

/// Completes on SIGINT or SIGTERM. A handler that fails to install is
/// logged and never fires; the other one still works.
pub async fn wait() {
    let received = first_of(interrupt(), terminate()).await;
    info!(signal = received.as_str(), "mail_service_shutting_down");
}
