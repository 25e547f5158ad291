use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{AppError, Result};

/// Install a handler that listens for SIGTERM and SIGINT.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received. The media server stops a transcode by signalling it, so this is
/// the operator-initiated stop for the remote job as well.
pub fn install_shutdown_handler() -> Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| AppError::SignalError(format!("failed to install SIGTERM handler: {}", e)))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| AppError::SignalError(format!("failed to install SIGINT handler: {}", e)))?;

    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, exit requested");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, exit requested");
            }
        }

        token_clone.cancel();
    });

    Ok(token)
}
