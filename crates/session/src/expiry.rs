//! Expiry watcher

use crate::error::StoreError;
use crate::manager::{LogoutReason, SessionManager};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Result of one expiry poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryCheck {
    Valid { remaining: Duration },
    LoggedOut(LogoutReason),
}

/// Polls the stored expiry and forces a logout once it has passed
#[derive(Debug, Clone)]
pub struct ExpiryWatcher {
    manager: SessionManager,
    interval: Duration,
}

impl ExpiryWatcher {
    pub fn new(manager: SessionManager) -> Self {
        let interval = manager.config().expiry_poll_interval();
        Self { manager, interval }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Compare the clock with the stored expiry once.
    ///
    /// A missing token or expiry and an expiry in the past both clear the
    /// session.
    pub fn check(&self) -> Result<ExpiryCheck, StoreError> {
        let snapshot = self.manager.snapshot()?;
        let now = self.manager.now();

        let reason = match (&snapshot.access, snapshot.expires_at) {
            (Some(_), Some(expires_at)) if now <= expires_at => {
                let remaining = (expires_at - now).to_std().unwrap_or_default();
                return Ok(ExpiryCheck::Valid { remaining });
            }
            (Some(_), Some(_)) => LogoutReason::Expired,
            _ => LogoutReason::MissingToken,
        };

        self.manager.logout(reason)?;
        Ok(ExpiryCheck::LoggedOut(reason))
    }

    /// Poll until the session ends or `cancel` fires.
    ///
    /// The first poll happens one interval after start.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Expiry watcher cancelled");
                    break;
                }
                _ = ticker.tick() => match self.check() {
                    Ok(ExpiryCheck::Valid { remaining }) => {
                        debug!(remaining_secs = remaining.as_secs(), "Session still valid");
                    }
                    Ok(ExpiryCheck::LoggedOut(_)) => break,
                    Err(e) => error!(error = %e, "Failed to read session state"),
                },
            }
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SessionConfig;
    use crate::manager::SessionEvent;
    use crate::store::MemoryStore;
    use crate::tokens::SessionTokens;
    use chrono::DateTime;
    use std::sync::Arc;

    fn setup() -> (Arc<ManualClock>, SessionManager) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let manager = SessionManager::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            SessionConfig::default(),
        );
        (clock, manager)
    }

    #[test]
    fn valid_session_reports_remaining_time() {
        let (clock, manager) = setup();
        manager.establish(SessionTokens::new("a")).unwrap();
        clock.advance(Duration::from_secs(100));

        let check = ExpiryWatcher::new(manager).check().unwrap();
        assert_eq!(
            check,
            ExpiryCheck::Valid {
                remaining: Duration::from_secs(200)
            }
        );
    }

    #[test]
    fn missing_token_forces_logout() {
        let (_, manager) = setup();
        manager.store().set_expiry(Some(manager.now())).unwrap();

        let check = ExpiryWatcher::new(manager.clone()).check().unwrap();
        assert_eq!(check, ExpiryCheck::LoggedOut(LogoutReason::MissingToken));
        assert!(manager.snapshot().unwrap().is_empty());
    }

    #[test]
    fn missing_expiry_forces_logout() {
        let (_, manager) = setup();
        manager.establish(SessionTokens::new("a")).unwrap();
        manager.store().set_expiry(None).unwrap();

        let check = ExpiryWatcher::new(manager).check().unwrap();
        assert_eq!(check, ExpiryCheck::LoggedOut(LogoutReason::MissingToken));
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_logs_out_after_expiry() {
        let (clock, manager) = setup();
        manager
            .establish(SessionTokens::new("a").with_refresh("r"))
            .unwrap();
        let mut events = manager.subscribe();

        let cancel = CancellationToken::new();
        let handle = ExpiryWatcher::new(manager.clone()).spawn(cancel.clone());

        // Two polls while still valid
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(manager.status().unwrap().is_active());

        clock.advance(Duration::from_secs(301));
        tokio::time::sleep(Duration::from_secs(5)).await;

        handle.await.unwrap();
        assert!(manager.snapshot().unwrap().is_empty());
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedOut {
                reason: LogoutReason::Expired
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_stops_on_cancel() {
        let (_, manager) = setup();
        manager.establish(SessionTokens::new("a")).unwrap();

        let cancel = CancellationToken::new();
        let handle = ExpiryWatcher::new(manager.clone()).spawn(cancel.clone());
        tokio::time::sleep(Duration::from_secs(7)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(manager.status().unwrap().is_active());
    }
}
