//! Signal handling for graceful shutdown.
//!
//! Listens for termination signals (SIGINT, SIGTERM on Unix; Ctrl+C on
//! Windows) so the simulation loop can stop between ticks.

use tokio::signal;
use tracing::info;

/// Resolves when a shutdown signal is received.
///
/// # Platform Support
///
/// * **Unix platforms**: Handles SIGINT and SIGTERM signals
/// * **Windows**: Handles Ctrl+C signal
pub async fn setup_signal_handlers() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    info!("📡 Received shutdown signal - stopping simulation");
    Ok(())
}
