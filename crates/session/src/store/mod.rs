//! Persisted session state

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::tokens::{AccessToken, RefreshToken, SessionSnapshot, SessionTokens};
use chrono::{DateTime, Utc};
use sportclub_http::Role;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Keys under which the session is persisted
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const ROLE: &str = "role";
    /// Milliseconds since the Unix epoch
    pub const TOKEN_EXPIRY: &str = "token_expiry";
}

/// Flat string key-value storage, the shape of browser local storage.
///
/// Implementations do not lock across calls; two writers racing on the same
/// backing store is accepted.
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Typed view of the session keys in a [`KeyValueStore`]
#[derive(Debug, Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, StoreError> {
        Ok(SessionSnapshot {
            access: self.read(keys::ACCESS_TOKEN)?.map(AccessToken::new),
            refresh: self.read(keys::REFRESH_TOKEN)?.map(RefreshToken::new),
            role: self.role()?,
            expires_at: self.expiry()?,
        })
    }

    /// Persist freshly issued tokens.
    ///
    /// The refresh token and role are only overwritten when `tokens` carries
    /// them; a refresh response without a rotated refresh token keeps the old
    /// one.
    pub fn save(&self, tokens: &SessionTokens, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.backend
            .set(keys::ACCESS_TOKEN, tokens.access.as_str())?;
        if let Some(refresh) = &tokens.refresh {
            self.backend.set(keys::REFRESH_TOKEN, refresh.as_str())?;
        }
        if let Some(role) = tokens.role {
            self.set_role(role)?;
        }
        self.set_expiry(Some(expires_at))
    }

    pub fn expiry(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(raw) = self.read(keys::TOKEN_EXPIRY)? else {
            return Ok(None);
        };
        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);
        if parsed.is_none() {
            warn!(value = %raw, "Ignoring unparsable token expiry");
        }
        Ok(parsed)
    }

    pub fn set_expiry(&self, expires_at: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        match expires_at {
            Some(at) => self
                .backend
                .set(keys::TOKEN_EXPIRY, &at.timestamp_millis().to_string()),
            None => self.backend.remove(keys::TOKEN_EXPIRY),
        }
    }

    pub fn role(&self) -> Result<Option<Role>, StoreError> {
        let Some(raw) = self.read(keys::ROLE)? else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(role) => Ok(Some(role)),
            Err(e) => {
                warn!(error = %e, "Ignoring stored role");
                Ok(None)
            }
        }
    }

    pub fn set_role(&self, role: Role) -> Result<(), StoreError> {
        self.backend.set(keys::ROLE, role.as_str())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.clear()
    }

    /// Read a key, treating sentinel strings left by older clients as absent
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .backend
            .get(key)?
            .filter(|value| !matches!(value.trim(), "" | "undefined" | "null")))
    }
}
