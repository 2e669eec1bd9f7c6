//! Sportclub CLI - sports-club course and class booking

mod commands;
mod config;
mod logging;
mod state_dir;

use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use commands::{Commands, Context};
use config::Settings;
use sportclub_http::TypedClientBuilder;
use sportclub_session::{FileStore, SessionClient, SessionError, SessionManager};
use state_dir::StateDir;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "sportclub")]
#[command(about = "Book sports-club courses and classes")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// State directory for the session file, config and logs
    #[arg(short = 'd', long, global = true, env = "SPORTCLUB_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Settings file (defaults to sportclub.toml in the config directory)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Backend API base URL, overriding the settings
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "30")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let state = StateDir::resolve(cli.state_dir.clone());

    let log_file = (!cli.no_file_log).then(|| state.log_file());
    logging::init_logging(cli.log_level.into(), log_file.as_deref())?;

    debug!("Starting Sportclub CLI");

    let ctx = build_context(&cli, &state)?;

    // The watch command runs until the session ends
    let result = if cli.timeout == 0 || cli.command.is_long_running() {
        cli.command.execute(&ctx).await
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(&ctx)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    };

    match result {
        Ok(()) => {
            debug!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            if needs_login(&e) {
                eprintln!("Please log in with `sportclub login`.");
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

fn build_context(cli: &Cli, state: &StateDir) -> Result<Context> {
    let (settings_path, required) = cli
        .config
        .clone()
        .map_or_else(|| (state.config_file(), false), |path| (path, true));
    let mut settings = Settings::load(&settings_path, required)?;
    if let Some(base_url) = &cli.base_url {
        settings.api.base_url.clone_from(base_url);
    }
    debug!(base_url = %settings.api.base_url, "Using backend");

    let mut builder = TypedClientBuilder::new().base_url(&settings.api.base_url);
    if let Some(timeout) = settings.api.timeout() {
        builder = builder.timeout(timeout);
    }
    let public = builder
        .build_public()
        .context("Failed to create API client")?;

    let store = FileStore::new(state.session_file());
    let manager = SessionManager::with_system_clock(Arc::new(store), settings.session);
    Ok(Context::new(SessionClient::new(public, manager)))
}

/// Whether the failure means the stored session is gone or unusable
fn needs_login(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<SessionError>()
            .is_some_and(SessionError::requires_login)
            || cause
                .downcast_ref::<sportclub_http::ClientError>()
                .is_some_and(sportclub_http::ClientError::is_auth_expired)
    })
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
