//! Silent token refresh
//!
//! At startup the coordinator decides between reusing the stored access
//! token, exchanging the refresh token once, or clearing the session. There
//! is no retry: one failed exchange logs the user out.

use crate::error::StoreError;
use crate::manager::{LogoutReason, SessionManager};
use crate::tokens::{AccessToken, RefreshToken, SessionTokens};
use async_trait::async_trait;
use sportclub_http::ClientError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Exchanges a refresh token for a new set of session tokens
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self, token: &RefreshToken) -> Result<SessionTokens, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The stored token had not expired yet; no network call was made
    Reused(AccessToken),
    /// A new access token was minted and stored
    Refreshed(AccessToken),
    /// The session was cleared
    LoggedOut(LogoutReason),
}

impl RefreshOutcome {
    pub fn access_token(&self) -> Option<&AccessToken> {
        match self {
            Self::Reused(token) | Self::Refreshed(token) => Some(token),
            Self::LoggedOut(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    manager: SessionManager,
    refresher: Arc<dyn Refresher>,
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl RefreshCoordinator {
    pub fn new(manager: SessionManager, refresher: Arc<dyn Refresher>) -> Self {
        Self { manager, refresher }
    }

    /// Run once when the client starts.
    ///
    /// - no refresh token: the session is cleared;
    /// - access token present and not expired: it is reused as-is;
    /// - otherwise: one refresh exchange, clearing the session on failure.
    pub async fn on_startup(&self) -> Result<RefreshOutcome, StoreError> {
        let snapshot = self.manager.snapshot()?;

        let Some(refresh) = snapshot.refresh.clone() else {
            debug!("No refresh token stored");
            return self.give_up(LogoutReason::MissingToken);
        };

        // Inclusive like the expiry watcher: a token is reused up to and
        // including its expiry instant
        if snapshot.is_valid_at(self.manager.now()) {
            if let Some(access) = snapshot.access {
                debug!("Stored access token still valid, skipping refresh");
                return Ok(RefreshOutcome::Reused(access));
            }
        }

        self.exchange(&refresh).await
    }

    /// Exchange the refresh token now, regardless of the current expiry
    pub async fn refresh_now(&self) -> Result<RefreshOutcome, StoreError> {
        match self.manager.snapshot()?.refresh {
            Some(refresh) => self.exchange(&refresh).await,
            None => {
                warn!("No refresh token to exchange");
                self.give_up(LogoutReason::MissingToken)
            }
        }
    }

    async fn exchange(&self, refresh: &RefreshToken) -> Result<RefreshOutcome, StoreError> {
        match self.refresher.refresh(refresh).await {
            Ok(tokens) => {
                let access = tokens.access.clone();
                self.manager.apply_refresh(tokens)?;
                info!("Silent refresh succeeded");
                Ok(RefreshOutcome::Refreshed(access))
            }
            Err(e) => {
                if e.is_network() {
                    error!(error = %e, "Network error during token refresh");
                } else {
                    warn!(error = %e, "Token refresh rejected");
                }
                self.give_up(LogoutReason::RefreshFailed)
            }
        }
    }

    fn give_up(&self, reason: LogoutReason) -> Result<RefreshOutcome, StoreError> {
        self.manager.logout(reason)?;
        Ok(RefreshOutcome::LoggedOut(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SessionConfig;
    use crate::store::MemoryStore;
    use chrono::DateTime;
    use sportclub_http::Role;
    use std::time::Duration;

    fn setup(refresher: MockRefresher) -> (Arc<ManualClock>, SessionManager, RefreshCoordinator) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let manager = SessionManager::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
            SessionConfig::default(),
        );
        let coordinator = RefreshCoordinator::new(manager.clone(), Arc::new(refresher));
        (clock, manager, coordinator)
    }

    #[tokio::test]
    async fn valid_token_is_reused_without_network() {
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh().never();
        let (_, manager, coordinator) = setup(refresher);
        manager
            .establish(SessionTokens::new("a1").with_refresh("r1"))
            .unwrap();

        let outcome = coordinator.on_startup().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Reused(AccessToken::new("a1")));
    }

    #[tokio::test]
    async fn token_at_exact_expiry_is_reused() {
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh().never();
        let (clock, manager, coordinator) = setup(refresher);
        let expires_at = manager
            .establish(SessionTokens::new("a1").with_refresh("r1"))
            .unwrap();
        clock.set(expires_at);

        let outcome = coordinator.on_startup().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Reused(AccessToken::new("a1")));
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once() {
        let mut refresher = MockRefresher::new();
        refresher
            .expect_refresh()
            .withf(|token| token.as_str() == "r1")
            .times(1)
            .returning(|_| {
                Ok(SessionTokens::new("a2")
                    .with_refresh("r2")
                    .with_role(Role::Admin))
            });
        let (clock, manager, coordinator) = setup(refresher);
        manager
            .establish(SessionTokens::new("a1").with_refresh("r1"))
            .unwrap();
        clock.advance(Duration::from_secs(600));

        let outcome = coordinator.on_startup().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed(AccessToken::new("a2")));

        let snapshot = manager.snapshot().unwrap();
        assert_eq!(snapshot.refresh, Some(RefreshToken::new("r2")));
        assert_eq!(snapshot.role, Some(Role::Admin));
        assert!(snapshot.is_valid_at(manager.now()));
        assert_eq!(manager.time_left().unwrap(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn rejected_refresh_clears_session() {
        let mut refresher = MockRefresher::new();
        refresher
            .expect_refresh()
            .times(1)
            .returning(|_| Err(ClientError::AuthenticationFailed("expired".into())));
        let (clock, manager, coordinator) = setup(refresher);
        manager
            .establish(SessionTokens::new("a1").with_refresh("r1"))
            .unwrap();
        clock.advance(Duration::from_secs(301));

        let outcome = coordinator.on_startup().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::LoggedOut(LogoutReason::RefreshFailed));
        assert!(manager.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_refresh_token_clears_session() {
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh().never();
        let (_, manager, coordinator) = setup(refresher);
        manager.establish(SessionTokens::new("a1")).unwrap();

        let outcome = coordinator.on_startup().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::LoggedOut(LogoutReason::MissingToken));
        assert!(manager.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_now_ignores_remaining_lifetime() {
        let mut refresher = MockRefresher::new();
        refresher
            .expect_refresh()
            .times(1)
            .returning(|_| Ok(SessionTokens::new("a2")));
        let (_, manager, coordinator) = setup(refresher);
        manager
            .establish(SessionTokens::new("a1").with_refresh("r1"))
            .unwrap();

        let outcome = coordinator.refresh_now().await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed(AccessToken::new("a2")));
        // Refresh token was not rotated, so the old one stays
        assert_eq!(
            manager.snapshot().unwrap().refresh,
            Some(RefreshToken::new("r1"))
        );
    }
}
