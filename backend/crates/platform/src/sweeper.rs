//! Periodic background cleanup
//!
//! A cancellable fixed-interval ticker. Each tick runs one sweep pass; the
//! loop ends when [`SweeperHandle::shutdown`] is called or the handle is
//! dropped.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Running sweeper task
#[derive(Debug)]
pub struct SweeperHandle {
    name: &'static str,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the ticker and wait for an in-flight pass to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            error!(sweeper = self.name, "Sweeper task failed: {}", e);
        }
    }
}

/// Spawn a sweeper that runs `pass` every `interval`
///
/// The first pass runs one full interval after spawning. A failing pass is
/// logged and the loop keeps going.
pub fn spawn_sweeper<F, Fut, E>(name: &'static str, interval: Duration, mut pass: F) -> SweeperHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<usize, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match pass().await {
                        Ok(0) => debug!(sweeper = name, "Sweep pass removed nothing"),
                        Ok(removed) => info!(sweeper = name, removed, "Swept expired entries"),
                        Err(e) => error!(sweeper = name, "Sweep pass failed: {}", e),
                    }
                }
                // Err means the sender was dropped; stop either way
                _ = shutdown_rx.changed() => {
                    debug!(sweeper = name, "Sweeper: shutdown requested");
                    break;
                }
            }
        }

        debug!(sweeper = name, "Sweeper exited");
    });

    SweeperHandle {
        name,
        shutdown_tx,
        handle,
    }
}
