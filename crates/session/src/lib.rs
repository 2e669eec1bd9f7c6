//! Client-side session lifecycle for the sports-club booking client
//!
//! The session is a handful of persisted strings (access token, refresh
//! token, role, expiry). Validity is decided only by comparing the wall
//! clock with the stored expiry; nothing here inspects token contents.
//!
//! Components run as independent timers, each on its own cadence:
//!
//! - [`ExpiryWatcher`] polls every few seconds and forces a logout once the
//!   expiry has passed or the token is gone.
//! - [`SessionTimer`] publishes the seconds left every second.
//! - [`KeepAlive`] pings the backend every ten minutes.
//!
//! [`RefreshCoordinator`] runs once at startup and [`ExpiryResetter`] runs on
//! every navigation.

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod expiry;
pub mod keepalive;
pub mod manager;
pub mod navigation;
pub mod refresh;
pub mod store;
pub mod tasks;
pub mod timer;
pub mod tokens;

pub use client::SessionClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::{ConfigError, SessionError, StoreError};
pub use expiry::{ExpiryCheck, ExpiryWatcher};
pub use keepalive::{KeepAlive, Pinger};
pub use manager::{LogoutReason, SessionEvent, SessionManager, SessionStatus};
pub use navigation::{ExpiryResetter, NavigationOutcome};
pub use refresh::{RefreshCoordinator, RefreshOutcome, Refresher};
pub use store::{FileStore, KeyValueStore, MemoryStore, TokenStore};
pub use tasks::SessionTasks;
pub use timer::{SessionTimer, format_countdown};
pub use tokens::{AccessToken, RefreshToken, SessionSnapshot, SessionTokens};
