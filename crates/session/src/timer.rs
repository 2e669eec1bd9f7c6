//! Countdown of the seconds left in the session

use crate::manager::SessionManager;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Render whole seconds as `m:ss`
pub fn format_countdown(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Publishes the remaining session time on a watch channel every tick
#[derive(Debug)]
pub struct SessionTimer {
    manager: SessionManager,
    tick: Duration,
    tx: watch::Sender<u64>,
}

impl SessionTimer {
    pub fn new(manager: SessionManager) -> (Self, watch::Receiver<u64>) {
        let tick = manager.config().timer_tick();
        let (tx, rx) = watch::channel(0);
        (Self { manager, tick, tx }, rx)
    }

    fn seconds_left(&self) -> u64 {
        match self.manager.time_left() {
            Ok(left) => left.as_secs(),
            Err(e) => {
                warn!(error = %e, "Failed to read session expiry");
                0
            }
        }
    }

    /// Tick until cancelled or every receiver is gone.
    ///
    /// The first value is published immediately.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.tx.send(self.seconds_left()).is_err() {
                        debug!("Session timer has no listeners");
                        break;
                    }
                }
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
