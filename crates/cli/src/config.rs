//! CLI settings
//!
//! Layered with the `config` crate: built-in defaults, then the TOML config
//! file, then `SPORTCLUB_*` environment variables (`__` separates sections,
//! e.g. `SPORTCLUB_API__BASE_URL`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sportclub_http::client::DEFAULT_BASE_URL;
use sportclub_session::SessionConfig;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "SPORTCLUB";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    /// Per-request timeout in seconds (0 = none)
    pub timeout_secs: u64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Settings {
    /// Load settings from `file` (optional unless `required`) and the
    /// process environment
    pub fn load(file: &Path, required: bool) -> Result<Self> {
        Self::load_with_env(file, required, config::Environment::default())
    }

    fn load_with_env(file: &Path, required: bool, env: config::Environment) -> Result<Self> {
        debug!(path = %file.display(), required, "Loading settings");
        let settings = config::Config::builder()
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("api.timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("session.access_ttl_secs", SessionConfig::DEFAULT_ACCESS_TTL_SECS)?
            .set_default("session.expiry_poll_secs", SessionConfig::DEFAULT_EXPIRY_POLL_SECS)?
            .set_default("session.timer_tick_secs", SessionConfig::DEFAULT_TIMER_TICK_SECS)?
            .set_default("session.keepalive_secs", SessionConfig::DEFAULT_KEEPALIVE_SECS)?
            .add_source(
                config::File::from(file)
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(
                env.prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load settings from {}", file.display()))?;

        let settings: Self = settings.try_deserialize()?;
        settings
            .session
            .validate()
            .context("Invalid [session] settings")?;
        Ok(settings)
    }
}
