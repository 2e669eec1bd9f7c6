//! Session-aware front door to the booking API
//!
//! [`SessionClient`] pairs the HTTP client with the [`SessionManager`]:
//! login and registration establish a session, authenticated calls pick up
//! the stored token, and a rejected token clears the session.

use crate::error::{Result, SessionError};
use crate::expiry::ExpiryWatcher;
use crate::keepalive::{KeepAlive, Pinger};
use crate::manager::{LogoutReason, SessionManager, SessionStatus};
use crate::navigation::ExpiryResetter;
use crate::refresh::{RefreshCoordinator, Refresher};
use crate::tasks::SessionTasks;
use crate::timer::SessionTimer;
use crate::tokens::{RefreshToken, SessionTokens};
use async_trait::async_trait;
use sportclub_http::types::{LoginRequest, RegisterRequest, UserProfile};
use sportclub_http::{AuthenticatedClubClient, ClientError, PublicClubClient, Role};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

#[async_trait]
impl Refresher for PublicClubClient {
    async fn refresh(&self, token: &RefreshToken) -> std::result::Result<SessionTokens, ClientError> {
        let response = Self::refresh(self, token.as_str()).await?;
        Ok(SessionTokens::from(response))
    }
}

#[async_trait]
impl Pinger for PublicClubClient {
    async fn ping(&self) -> std::result::Result<(), ClientError> {
        Self::ping(self).await
    }
}

#[derive(Debug, Clone)]
pub struct SessionClient {
    public: PublicClubClient,
    manager: SessionManager,
}

impl SessionClient {
    pub fn new(public: PublicClubClient, manager: SessionManager) -> Self {
        Self { public, manager }
    }

    pub fn public(&self) -> &PublicClubClient {
        &self.public
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    /// Coordinator that refreshes through this client's backend
    pub fn coordinator(&self) -> RefreshCoordinator {
        RefreshCoordinator::new(self.manager.clone(), Arc::new(self.public.clone()))
    }

    pub fn resetter(&self) -> ExpiryResetter {
        ExpiryResetter::new(self.manager.clone())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Option<Role>> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.public.login(&request).await?;
        let tokens = SessionTokens::from(response);
        let role = tokens.role;
        self.manager.establish(tokens)?;
        info!(email, ?role, "Logged in");
        Ok(role)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<Role>> {
        let response = self.public.register(request).await?;
        let tokens = SessionTokens::from(response);
        let role = tokens.role;
        self.manager.establish(tokens)?;
        info!(email = %request.email, "Registered new account");
        Ok(role)
    }

    pub fn logout(&self) -> Result<()> {
        self.manager.logout(LogoutReason::Manual)?;
        Ok(())
    }

    /// Authenticated client for the stored token.
    ///
    /// An expired session is cleared before the error is returned.
    pub fn authenticated(&self) -> Result<AuthenticatedClubClient> {
        let snapshot = self.manager.snapshot()?;
        match self.manager.status_of(&snapshot) {
            SessionStatus::Anonymous => Err(SessionError::NotAuthenticated),
            SessionStatus::Expired { .. } => {
                self.manager.logout(LogoutReason::Expired)?;
                Err(SessionError::Expired)
            }
            SessionStatus::Active { .. } => match snapshot.access {
                Some(token) => Ok(self.public.with_token(token.as_str())),
                None => Err(SessionError::NotAuthenticated),
            },
        }
    }

    /// Run an authenticated call, clearing the session if the token is
    /// rejected
    pub async fn with_auth<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: FnOnce(AuthenticatedClubClient) -> Fut,
        Fut: Future<Output = std::result::Result<T, ClientError>>,
    {
        let client = self.authenticated()?;
        match call(client).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_auth_expired() => {
                self.manager.logout(LogoutReason::Unauthorized)?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Confirm the session with the backend and record the current role.
    ///
    /// Any failure clears the session.
    pub async fn verify(&self) -> Result<UserProfile> {
        let client = self.authenticated()?;
        match client.me().await {
            Ok(profile) => {
                self.manager.set_role(profile.role)?;
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Session verification failed");
                self.manager.logout(LogoutReason::Unauthorized)?;
                Err(e.into())
            }
        }
    }

    pub async fn delete_account(&self) -> Result<String> {
        let response = self.with_auth(|c| async move { c.delete_account().await }).await?;
        self.manager.logout(LogoutReason::AccountDeleted)?;
        Ok(response.message)
    }

    /// Spawn the expiry watcher, countdown timer and keep-alive.
    ///
    /// The receiver carries the seconds left in the session.
    pub fn start_background(&self) -> (SessionTasks, watch::Receiver<u64>) {
        let config = self.manager.config();
        let mut tasks = SessionTasks::new();

        tasks.spawn_expiry_watcher(ExpiryWatcher::new(self.manager.clone()));

        let (timer, remaining) = SessionTimer::new(self.manager.clone());
        tasks.spawn_timer(timer);

        let pinger: Arc<dyn Pinger> = Arc::new(self.public.clone());
        tasks.spawn_keepalive(KeepAlive::new(pinger, config.keepalive_interval()));

        (tasks, remaining)
    }
}
