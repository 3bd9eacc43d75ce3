//! # No-Show Sweeper
//!
//! Background task that periodically marks overdue reservations as no-shows.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     No-Show Sweeper                                     │
//! │                                                                         │
//! │   interval(every) ──tick──► Branch::sweep_no_shows() ──► ids marked     │
//! │          │                                                              │
//! │          │   select!                                                    │
//! │          ▼                                                              │
//! │   shutdown_rx ──recv──► break                                           │
//! │                                                                         │
//! │  The sweep is idempotent: a reservation already marked is skipped,     │
//! │  so a tick that overlaps a manual sweep does no harm.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::branch::Branch;

/// Handle to a running sweeper.
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.join.await {
            error!(error = %e, "No-show sweeper task ended abnormally");
        }
    }
}

/// Spawns the sweeper on the current tokio runtime.
pub fn spawn_no_show_sweeper(branch: Arc<Branch>, every: Duration) -> SweeperHandle {
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let join = tokio::spawn(run(branch, every, shutdown_rx));
    SweeperHandle { shutdown_tx, join }
}

async fn run(branch: Arc<Branch>, every: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
    info!(branch = %branch.id(), every_secs = every.as_secs(), "No-show sweeper started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match branch.sweep_no_shows() {
                    Ok(marked) if marked.is_empty() => debug!("No overdue reservations"),
                    Ok(marked) => info!(count = marked.len(), ids = ?marked, "Swept no-shows"),
                    Err(e) => error!(error = %e, "No-show sweep failed"),
                }
            }
            _ = shutdown_rx.recv() => {
                info!(branch = %branch.id(), "No-show sweeper shutting down");
                break;
            }
        }
    }
}
