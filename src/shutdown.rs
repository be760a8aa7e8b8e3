//! Graceful Shutdown Handling
//!
//! Listens for SIGTERM and SIGINT, tells the HTTP server to stop accepting, and
//! bounds how long open relay sessions may keep the process alive.

use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};
use crate::Result;

/// Shutdown coordinator that manages graceful shutdown process
pub struct ShutdownCoordinator {
    /// Broadcast sender for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// How long to wait for the server to drain
    timeout: Duration,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            shutdown_tx,
            timeout,
        }
    }

    /// Get a shutdown receiver for components to listen for shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Future resolving once shutdown has been triggered
    pub fn signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Broadcast shutdown to every subscriber
    pub fn trigger(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal: {}", e);
        }
    }

    /// Wait for SIGTERM, SIGINT or Ctrl+C, then trigger shutdown
    pub async fn listen_for_signals(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
                _ = signal::ctrl_c() => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        self.trigger();
        Ok(())
    }

    /// Wait for the server task, aborting it once the timeout passes
    pub async fn drain(&self, mut handle: JoinHandle<Result<()>>) -> Result<()> {
        info!("Waiting up to {:?} for open sessions to close", self.timeout);

        match timeout(self.timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.is_cancelled() => Ok(()),
            Ok(Err(e)) => {
                error!("Server task failed: {}", e);
                Err(anyhow::anyhow!("Server task failed: {}", e))
            }
            Err(_) => {
                warn!(
                    "Shutdown timeout reached after {:?}, closing remaining sessions",
                    self.timeout
                );
                handle.abort();
                Ok(())
            }
        }
    }
}
