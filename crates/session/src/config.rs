//! Session lifecycle configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing knobs for the session components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime granted to the access token on login, refresh and navigation
    pub access_ttl_secs: u64,

    /// Cadence of the expiry watcher
    pub expiry_poll_secs: u64,

    /// Cadence of the countdown timer
    pub timer_tick_secs: u64,

    /// Cadence of the backend keep-alive ping
    pub keepalive_secs: u64,
}

impl SessionConfig {
    /// Matches the backend's access-token lifetime
    pub const DEFAULT_ACCESS_TTL_SECS: u64 = 5 * 60;
    pub const DEFAULT_EXPIRY_POLL_SECS: u64 = 5;
    pub const DEFAULT_TIMER_TICK_SECS: u64 = 1;
    pub const DEFAULT_KEEPALIVE_SECS: u64 = 10 * 60;
    /// One year; keeps every computed expiry inside chrono's range
    pub const MAX_ACCESS_TTL_SECS: u64 = 365 * 24 * 60 * 60;

    /// Reject values the session cannot represent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_ttl_secs > Self::MAX_ACCESS_TTL_SECS {
            return Err(ConfigError::AccessTtlTooLarge {
                value: self.access_ttl_secs,
                max: Self::MAX_ACCESS_TTL_SECS,
            });
        }
        Ok(())
    }

    /// Token lifetime, capped at [`Self::MAX_ACCESS_TTL_SECS`]
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs.min(Self::MAX_ACCESS_TTL_SECS))
    }

    pub fn expiry_poll_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_poll_secs.max(1))
    }

    pub fn timer_tick(&self) -> Duration {
        Duration::from_secs(self.timer_tick_secs.max(1))
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: Self::DEFAULT_ACCESS_TTL_SECS,
            expiry_poll_secs: Self::DEFAULT_EXPIRY_POLL_SECS,
            timer_tick_secs: Self::DEFAULT_TIMER_TICK_SECS,
            keepalive_secs: Self::DEFAULT_KEEPALIVE_SECS,
        }
    }
}
