//! Session error types

use sportclub_http::ClientError;
use thiserror::Error;

/// Failure reading or writing the persisted token store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt session file: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Session settings outside the supported range
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("access_ttl_secs must be at most {max}, got {value}")]
    AccessTtlTooLarge { value: u64, max: u64 },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Session expired, please log in again")]
    Expired,
}

impl SessionError {
    /// Whether the caller has to log in before retrying
    pub fn requires_login(&self) -> bool {
        match self {
            Self::NotAuthenticated | Self::Expired => true,
            Self::Client(e) => e.is_auth_expired(),
            Self::Store(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
