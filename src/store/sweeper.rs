//! Periodic background sweep.
//!
//! Eviction normally happens lazily at the start of each conversion request.
//! When a sweep interval is configured, this task additionally runs
//! [`ArtifactStore::sweep`] on a timer so idle servers still reclaim disk.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::registry::ArtifactStore;

/// Background task that sweeps a store on a fixed period.
pub struct Sweeper {
    store: Arc<ArtifactStore>,
    period: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle used to stop a running [`Sweeper`].
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn a sweeper on the current runtime.
    ///
    /// The first sweep runs one full `period` after spawning.
    pub fn spawn(store: Arc<ArtifactStore>, period: Duration) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let mut sweeper = Sweeper {
            store,
            period,
            shutdown_rx,
        };
        let task = tokio::spawn(async move { sweeper.run().await });

        SweeperHandle { shutdown_tx, task }
    }

    async fn run(&mut self) {
        info!(period_secs = self.period.as_secs(), "background sweeper starting");

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; skip that tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("background sweeper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = self.store.sweep(Utc::now()).await;
                    debug!(removed, "background sweep finished");
                }
            }
        }

        info!("background sweeper stopped");
    }
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}
