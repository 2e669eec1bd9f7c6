//! Route-triggered expiry reset
//!
//! Every navigation slides the expiry forward by one access TTL. This is a
//! client-side sliding window only; the backend token keeps its own lifetime.

use crate::error::StoreError;
use crate::manager::SessionManager;
use chrono::{DateTime, Utc};
use sportclub_http::Role;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// No access token stored; the expiry key was removed
    Anonymous,
    Extended {
        expires_at: DateTime<Utc>,
        role: Option<Role>,
    },
}

#[derive(Debug, Clone)]
pub struct ExpiryResetter {
    manager: SessionManager,
}

impl ExpiryResetter {
    pub fn new(manager: SessionManager) -> Self {
        Self { manager }
    }

    /// Called with the route name on every route change
    pub fn on_navigate(&self, route: &str) -> Result<NavigationOutcome, StoreError> {
        let Some(expires_at) = self.manager.extend_expiry()? else {
            debug!(route, "Navigation without a session");
            return Ok(NavigationOutcome::Anonymous);
        };
        // Role is re-read so a login in another process is picked up
        let role = self.manager.role()?;
        debug!(route, %expires_at, ?role, "Navigation extended session");
        Ok(NavigationOutcome::Extended { expires_at, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::config::SessionConfig;
    use crate::store::MemoryStore;
    use crate::tokens::SessionTokens;
    use std::sync::Arc;
    use std::time::Duration;

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
    fn navigation_slides_expiry_forward() {
        let (clock, manager) = setup();
        manager
            .establish(SessionTokens::new("a").with_role(Role::Admin))
            .unwrap();
        clock.advance(Duration::from_secs(200));

        let outcome = ExpiryResetter::new(manager.clone())
            .on_navigate("courses")
            .unwrap();
        let expected = clock.now() + chrono::Duration::seconds(300);
        assert_eq!(
            outcome,
            NavigationOutcome::Extended {
                expires_at: expected,
                role: Some(Role::Admin)
            }
        );
        assert_eq!(manager.store().expiry().unwrap(), Some(expected));
    }

    #[test]
    fn navigation_can_revive_an_expired_session() {
        let (clock, manager) = setup();
        manager.establish(SessionTokens::new("a")).unwrap();
        clock.advance(Duration::from_secs(400));
        assert!(!manager.status().unwrap().is_active());

        ExpiryResetter::new(manager.clone())
            .on_navigate("home")
            .unwrap();
        assert!(manager.status().unwrap().is_active());
    }

    #[test]
    fn navigation_without_token_removes_expiry() {
        let (_, manager) = setup();
        manager.store().set_expiry(Some(manager.now())).unwrap();

        let outcome = ExpiryResetter::new(manager.clone())
            .on_navigate("login")
            .unwrap();
        assert_eq!(outcome, NavigationOutcome::Anonymous);
        assert_eq!(manager.store().expiry().unwrap(), None);
    }
}
