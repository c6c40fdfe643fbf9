// Runtime module - shutdown coordination for the HTTP server
use std::future::Future;
use tokio::signal;
use tokio::sync::watch;

/// Lightweight coordination for graceful shutdown
///
/// Clone freely; every clone observes the same shutdown signal.
#[derive(Clone)]
pub struct TrackerRuntime {
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TrackerRuntime {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get a receiver to watch for shutdown signals
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Trigger a programmatic shutdown
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Create a unified shutdown future that responds to both Ctrl+C and
    /// programmatic shutdown
    ///
    /// Use this with axum's `with_graceful_shutdown()`.
    pub fn create_shutdown_future(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut shutdown_rx = self.shutdown_rx.clone();

        async move {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    eprintln!("\nShutdown signal (Ctrl+C) received...");
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        eprintln!("\nShutdown triggered...");
                    }
                }
            }
        }
    }
}

impl Default for TrackerRuntime {
    fn default() -> Self {
        Self::new()
    }
}
