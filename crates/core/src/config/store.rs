//! On-disk configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::info;

use super::{load_config, types::Config, validate_config, ConfigError};

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// App-data directory holding the config and the episode ledger.
///
/// `ANISYNC_HOME` takes precedence over the platform data directory.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("ANISYNC_HOME") {
        return Some(PathBuf::from(home));
    }
    ProjectDirs::from("", "", "anisync").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Reads and writes the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for `config.toml` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, writing the defaults first if the file is missing.
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            self.write(&Config::default())?;
            info!(path = %self.path.display(), "Wrote default configuration");
        }
        load_config(&self.path)
    }

    /// Validate and persist a configuration.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        validate_config(config)?;
        self.write(config)
    }

    fn write(&self, config: &Config) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, contents).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| ConfigError::WriteError(e.to_string()))
    }
}
