//! Platform-specific state directory management

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::warn;

pub const SESSION_FILE: &str = "session.json";
pub const CONFIG_FILE: &str = "sportclub.toml";
pub const LOG_FILE: &str = "cli.log";

/// Manages platform-specific application directories
#[derive(Debug)]
pub struct StateDir {
    project_dirs: Option<ProjectDirs>,
    /// Override directory for testing or custom installations
    override_dir: Option<PathBuf>,
}

impl StateDir {
    pub fn new() -> Self {
        let project_dirs = ProjectDirs::from("com", "Sportclub", "sportclub");
        if project_dirs.is_none() {
            warn!("Failed to determine platform-specific directories, will use fallback");
        }
        Self {
            project_dirs,
            override_dir: None,
        }
    }

    pub fn with_override(path: impl Into<PathBuf>) -> Self {
        Self {
            project_dirs: None,
            override_dir: Some(path.into()),
        }
    }

    /// Use the override when given, else the platform directories
    pub fn resolve(override_dir: Option<PathBuf>) -> Self {
        override_dir.map_or_else(Self::new, Self::with_override)
    }

    pub fn config_dir(&self) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            return override_dir.join("config");
        }
        self.project_dirs
            .as_ref()
            .map_or_else(|| PathBuf::from("./config"), |d| d.config_dir().to_path_buf())
    }

    /// Directory holding the session file and the CLI log
    pub fn data_dir(&self) -> PathBuf {
        if let Some(override_dir) = &self.override_dir {
            return override_dir.join("data");
        }
        self.project_dirs
            .as_ref()
            .map_or_else(|| PathBuf::from("./data"), |d| d.data_dir().to_path_buf())
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join(CONFIG_FILE)
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir().join(SESSION_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir().join(LOG_FILE)
    }
}

impl Default for StateDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_dir_layout() {
        let dir = StateDir::with_override("/tmp/sportclub-test");
        assert_eq!(
            dir.session_file(),
            PathBuf::from("/tmp/sportclub-test/data/session.json")
        );
        assert_eq!(
            dir.config_file(),
            PathBuf::from("/tmp/sportclub-test/config/sportclub.toml")
        );
        assert_eq!(dir.log_file(), PathBuf::from("/tmp/sportclub-test/data/cli.log"));
    }

    #[test]
    fn resolve_prefers_override() {
        let dir = StateDir::resolve(Some(PathBuf::from("custom")));
        assert_eq!(dir.data_dir(), PathBuf::from("custom/data"));
    }
}
