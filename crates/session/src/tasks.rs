//! Lifetime of the background session timers

use crate::expiry::ExpiryWatcher;
use crate::keepalive::KeepAlive;
use crate::timer::SessionTimer;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Owns the spawned timers and stops them together.
///
/// Dropping the set cancels every task without waiting for it.
#[derive(Debug, Default)]
pub struct SessionTasks {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl SessionTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token shared by every task in the set
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn spawn_expiry_watcher(&mut self, watcher: ExpiryWatcher) {
        self.handles.push(watcher.spawn(self.cancel.child_token()));
    }

    pub fn spawn_timer(&mut self, timer: SessionTimer) {
        self.handles.push(timer.spawn(self.cancel.child_token()));
    }

    pub fn spawn_keepalive(&mut self, keepalive: KeepAlive) {
        self.handles.push(keepalive.spawn(self.cancel.child_token()));
    }

    /// Cancel every task and wait for it to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!(error = %e, "Session task panicked");
                }
            }
        }
        debug!("Session tasks stopped");
    }
}

impl Drop for SessionTasks {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
