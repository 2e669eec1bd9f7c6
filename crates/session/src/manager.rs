//! Session state owner
//!
//! [`SessionManager`] is the single place that writes the token store. The
//! timers, the refresh coordinator and the navigation hook all go through it,
//! and every state change is broadcast as a [`SessionEvent`].

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::error::StoreError;
use crate::store::{KeyValueStore, TokenStore};
use crate::tokens::{AccessToken, SessionSnapshot, SessionTokens};
use chrono::{DateTime, Utc};
use sportclub_http::Role;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 16;

/// Why the session was torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to log out
    Manual,
    /// The stored expiry passed
    Expired,
    /// The access token, refresh token or expiry was missing
    MissingToken,
    /// The refresh exchange was rejected or could not reach the backend
    RefreshFailed,
    /// The backend rejected the access token
    Unauthorized,
    /// The account no longer exists
    AccountDeleted,
}

impl LogoutReason {
    /// Whether the logout happened without the user asking for it
    pub fn is_forced(self) -> bool {
        !matches!(self, Self::Manual | Self::AccountDeleted)
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Manual => "logged out",
            Self::Expired => "session expired",
            Self::MissingToken => "no session token",
            Self::RefreshFailed => "token refresh failed",
            Self::Unauthorized => "token rejected by server",
            Self::AccountDeleted => "account deleted",
        };
        f.write_str(text)
    }
}

/// Session state changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn {
        role: Option<Role>,
        expires_at: DateTime<Utc>,
    },
    Refreshed {
        expires_at: DateTime<Utc>,
    },
    ExpiryExtended {
        expires_at: DateTime<Utc>,
    },
    /// The store was cleared; consumers should send the user back to login
    LoggedOut {
        reason: LogoutReason,
    },
}

/// Coarse session state derived from the store and the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Active { expires_at: DateTime<Utc> },
    /// A token is stored but its expiry has passed or is missing
    Expired { expired_at: Option<DateTime<Utc>> },
}

impl SessionStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Owner of the persisted session
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: TokenStore,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    events: broadcast::Sender<SessionEvent>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("store", &self.inner.store)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store: TokenStore::new(backend),
                clock,
                config,
                events,
            }),
        }
    }

    pub fn with_system_clock(backend: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
        Self::new(backend, Arc::new(SystemClock), config)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.inner.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, StoreError> {
        self.inner.store.snapshot()
    }

    pub fn status(&self) -> Result<SessionStatus, StoreError> {
        let snapshot = self.snapshot()?;
        Ok(self.status_of(&snapshot))
    }

    pub(crate) fn status_of(&self, snapshot: &SessionSnapshot) -> SessionStatus {
        if snapshot.access.is_none() {
            return SessionStatus::Anonymous;
        }
        match snapshot.expires_at {
            Some(expires_at) if self.now() <= expires_at => SessionStatus::Active { expires_at },
            expired_at => SessionStatus::Expired { expired_at },
        }
    }

    /// The access token, only while it has not expired
    pub fn access_token(&self) -> Result<Option<AccessToken>, StoreError> {
        let snapshot = self.snapshot()?;
        if snapshot.is_valid_at(self.now()) {
            Ok(snapshot.access)
        } else {
            Ok(None)
        }
    }

    pub fn role(&self) -> Result<Option<Role>, StoreError> {
        self.inner.store.role()
    }

    pub fn set_role(&self, role: Role) -> Result<(), StoreError> {
        self.inner.store.set_role(role)
    }

    /// Whole seconds until the stored expiry, zero when absent or past
    pub fn time_left(&self) -> Result<Duration, StoreError> {
        let Some(expires_at) = self.inner.store.expiry()? else {
            return Ok(Duration::ZERO);
        };
        let left = (expires_at - self.now()).to_std().unwrap_or_default();
        Ok(Duration::from_secs(left.as_secs()))
    }

    fn next_expiry(&self) -> DateTime<Utc> {
        let now = self.now();
        chrono::Duration::from_std(self.inner.config.access_ttl())
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Start a session from login or registration
    pub fn establish(&self, tokens: SessionTokens) -> Result<DateTime<Utc>, StoreError> {
        let expires_at = self.next_expiry();
        self.inner.store.clear()?;
        self.inner.store.save(&tokens, expires_at)?;
        info!(role = ?tokens.role, %expires_at, "Session established");
        self.emit(SessionEvent::LoggedIn {
            role: tokens.role,
            expires_at,
        });
        Ok(expires_at)
    }

    /// Store tokens minted by a refresh exchange
    pub fn apply_refresh(&self, tokens: SessionTokens) -> Result<DateTime<Utc>, StoreError> {
        let expires_at = self.next_expiry();
        self.inner.store.save(&tokens, expires_at)?;
        info!(%expires_at, rotated = tokens.refresh.is_some(), "Access token refreshed");
        self.emit(SessionEvent::Refreshed { expires_at });
        Ok(expires_at)
    }

    /// Push the expiry out by one access TTL.
    ///
    /// Without an access token the expiry key is removed instead and `None`
    /// is returned.
    pub fn extend_expiry(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        if self.snapshot()?.access.is_none() {
            self.inner.store.set_expiry(None)?;
            return Ok(None);
        }
        let expires_at = self.next_expiry();
        self.inner.store.set_expiry(Some(expires_at))?;
        debug!(%expires_at, "Session expiry extended");
        self.emit(SessionEvent::ExpiryExtended { expires_at });
        Ok(Some(expires_at))
    }

    /// Clear all session state and announce the logout
    pub fn logout(&self, reason: LogoutReason) -> Result<(), StoreError> {
        self.inner.store.clear()?;
        if reason.is_forced() {
            warn!(%reason, "Forced logout");
        } else {
            info!(%reason, "Logged out");
        }
        self.emit(SessionEvent::LoggedOut { reason });
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn manager() -> (Arc<ManualClock>, SessionManager) {
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

    fn tokens() -> SessionTokens {
        SessionTokens::new("access")
            .with_refresh("refresh")
            .with_role(Role::User)
    }

    #[test]
    fn establish_sets_expiry_one_ttl_ahead() {
        let (clock, manager) = manager();
        let expires_at = manager.establish(tokens()).unwrap();
        assert_eq!((expires_at - clock.now()).num_seconds(), 300);
        assert_eq!(manager.status().unwrap(), SessionStatus::Active { expires_at });
        assert_eq!(manager.role().unwrap(), Some(Role::User));
    }

    #[test]
    fn huge_ttl_is_capped_instead_of_overflowing() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        for access_ttl_secs in [10_000_000_000_000, u64::MAX] {
            let manager = SessionManager::new(
                Arc::new(MemoryStore::new()),
                clock.clone(),
                SessionConfig {
                    access_ttl_secs,
                    ..Default::default()
                },
            );
            let expires_at = manager.establish(tokens()).unwrap();
            let max_ttl = i64::try_from(SessionConfig::MAX_ACCESS_TTL_SECS).unwrap();
            assert_eq!((expires_at - clock.now()).num_seconds(), max_ttl);
            assert!(manager.status().unwrap().is_active());
        }
    }

    #[test]
    fn status_expires_strictly_after_expiry() {
        let (clock, manager) = manager();
        let expires_at = manager.establish(tokens()).unwrap();

        clock.set(expires_at);
        assert!(manager.status().unwrap().is_active());
        assert!(manager.access_token().unwrap().is_some());

        clock.advance(Duration::from_millis(1));
        assert_eq!(
            manager.status().unwrap(),
            SessionStatus::Expired {
                expired_at: Some(expires_at)
            }
        );
        assert_eq!(manager.access_token().unwrap(), None);
    }

    #[test]
    fn time_left_floors_and_clamps() {
        let (clock, manager) = manager();
        assert_eq!(manager.time_left().unwrap(), Duration::ZERO);

        manager.establish(tokens()).unwrap();
        clock.advance(Duration::from_millis(1_500));
        assert_eq!(manager.time_left().unwrap(), Duration::from_secs(298));

        clock.advance(Duration::from_secs(600));
        assert_eq!(manager.time_left().unwrap(), Duration::ZERO);
    }

    #[test]
    fn extend_without_token_drops_expiry() {
        let (_, manager) = manager();
        manager
            .store()
            .set_expiry(Some(manager.now()))
            .unwrap();
        assert_eq!(manager.extend_expiry().unwrap(), None);
        assert_eq!(manager.store().expiry().unwrap(), None);
    }

    #[test]
    fn logout_clears_and_broadcasts() {
        let (_, manager) = manager();
        let mut events = manager.subscribe();
        manager.establish(tokens()).unwrap();
        manager.logout(LogoutReason::Expired).unwrap();

        assert!(manager.snapshot().unwrap().is_empty());
        assert!(matches!(events.try_recv(), Ok(SessionEvent::LoggedIn { .. })));
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoggedOut {
                reason: LogoutReason::Expired
            }
        );
    }

    #[test]
    fn establish_replaces_previous_account() {
        let (_, manager) = manager();
        manager.establish(tokens().with_role(Role::Admin)).unwrap();
        manager.establish(SessionTokens::new("other")).unwrap();

        let snapshot = manager.snapshot().unwrap();
        assert_eq!(snapshot.refresh, None);
        assert_eq!(snapshot.role, None);
    }
}
