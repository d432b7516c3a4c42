//! Shutdown signal handling for record mode

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Which OS signal asked us to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownKind {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
}

/// Shutdown flag shared with the poll loop
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Receiver that turns true once shutdown is requested
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    /// Request shutdown
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Listen for SIGINT/SIGTERM (Ctrl+C elsewhere) and trigger shutdown.
    ///
    /// The returned handle resolves with the signal that arrived.
    pub fn setup(&self) -> Result<tokio::task::JoinHandle<ShutdownKind>, std::io::Error> {
        let sender = Arc::clone(&self.sender);
        let wait = wait_for_signal()?;
        Ok(tokio::spawn(async move {
            let kind = wait.await;
            info!(?kind, "shutdown requested");
            sender.send_replace(true);
            kind
        }))
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn wait_for_signal(
) -> Result<impl std::future::Future<Output = ShutdownKind> + Send + 'static, std::io::Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => ShutdownKind::Interrupt,
            _ = sigterm.recv() => ShutdownKind::Terminate,
        }
    })
}

#[cfg(not(unix))]
fn wait_for_signal(
) -> Result<impl std::future::Future<Output = ShutdownKind> + Send + 'static, std::io::Error> {
    Ok(async move {
        // Without a handler installed the default action already exits
        let _ = tokio::signal::ctrl_c().await;
        ShutdownKind::Interrupt
    })
}
