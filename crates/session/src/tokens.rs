//! Session credentials

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sportclub_http::Role;
use sportclub_http::types::AuthResponse;
use std::fmt;

/// Short-lived bearer credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

/// Longer-lived credential used to mint new access tokens
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RefreshToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens end up in logs via Debug, so only a prefix is shown
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken({}…)", prefix(&self.0))
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefreshToken({}…)", prefix(&self.0))
    }
}

fn prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(6)
        .map_or(token.len(), |(idx, _)| idx);
    &token[..end]
}

/// Credentials handed out by login, register and refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access: AccessToken,
    /// Absent when the backend did not rotate the refresh token
    pub refresh: Option<RefreshToken>,
    pub role: Option<Role>,
}

impl SessionTokens {
    pub fn new(access: impl Into<String>) -> Self {
        Self {
            access: AccessToken::new(access),
            refresh: None,
            role: None,
        }
    }

    pub fn with_refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(RefreshToken::new(refresh));
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

impl From<AuthResponse> for SessionTokens {
    fn from(response: AuthResponse) -> Self {
        Self {
            access: AccessToken::new(response.access_token),
            refresh: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(RefreshToken::new),
            role: response.role,
        }
    }
}

/// Everything currently persisted for the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub access: Option<AccessToken>,
    pub refresh: Option<RefreshToken>,
    pub role: Option<Role>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// An access token is usable while `now <= expires_at`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.access.is_some() && self.expires_at.is_some_and(|expiry| now <= expiry)
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none()
            && self.refresh.is_none()
            && self.role.is_none()
            && self.expires_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn debug_output_is_truncated() {
        let token = AccessToken::new("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        assert_eq!(format!("{token:?}"), "AccessToken(eyJhbG…)");
    }

    #[test]
    fn validity_is_inclusive_of_expiry() {
        let expiry = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let snapshot = SessionSnapshot {
            access: Some(AccessToken::new("a")),
            expires_at: Some(expiry),
            ..Default::default()
        };
        assert!(snapshot.is_valid_at(expiry));
        assert!(!snapshot.is_valid_at(expiry + Duration::milliseconds(1)));
    }

    #[test]
    fn missing_expiry_is_never_valid() {
        let snapshot = SessionSnapshot {
            access: Some(AccessToken::new("a")),
            ..Default::default()
        };
        assert!(!snapshot.is_valid_at(Utc::now()));
    }

    #[test]
    fn empty_refresh_token_is_dropped() {
        let tokens = SessionTokens::from(AuthResponse {
            access_token: "a".into(),
            refresh_token: Some(String::new()),
            role: Some(Role::User),
            message: None,
        });
        assert_eq!(tokens.refresh, None);
        assert_eq!(tokens.role, Some(Role::User));
    }
}
