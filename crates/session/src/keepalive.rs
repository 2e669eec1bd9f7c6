//! Backend keep-alive
//!
//! Periodically hits a public endpoint so an idle backend host does not spin
//! down. Results are logged and never affect the session.

use async_trait::async_trait;
use sportclub_http::ClientError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self) -> Result<(), ClientError>;
}

pub struct KeepAlive {
    pinger: Arc<dyn Pinger>,
    interval: Duration,
}

impl fmt::Debug for KeepAlive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepAlive")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl KeepAlive {
    pub fn new(pinger: Arc<dyn Pinger>, interval: Duration) -> Self {
        Self { pinger, interval }
    }

    /// Ping once, logging the result
    pub async fn ping_once(&self) -> bool {
        match self.pinger.ping().await {
            Ok(()) => {
                info!("Ping success");
                true
            }
            Err(e) => {
                warn!(error = %e, "Ping failed");
                false
            }
        }
    }

    /// Ping every interval until cancelled; the first ping waits one interval
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Keep-alive cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.ping_once().await;
                }
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
