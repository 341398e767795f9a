//! Settings Manager
//!
//! Resolves platform directories and loads the active configuration.

use crate::config::Config;
use crate::error::{SettingsError, SettingsResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const APP_DIR: &str = "topokit";
const CONFIG_FILES: [&str; 2] = ["config.toml", "config.json"];
const DATABASE_FILE: &str = "projects.db";

/// Loads, holds and stores the application configuration
#[derive(Debug, Clone)]
pub struct SettingsManager {
    config: Config,
    source: Option<PathBuf>,
}

impl SettingsManager {
    /// Platform configuration directory (`~/.config/topokit` on Linux)
    pub fn config_dir() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| SettingsError::ConfigDirectory("no config directory".to_string()))
    }

    /// Platform data directory (`~/.local/share/topokit` on Linux)
    pub fn data_dir() -> SettingsResult<PathBuf> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or_else(|| SettingsError::ConfigDirectory("no data directory".to_string()))
    }

    /// Default configuration file path
    pub fn config_file_path() -> SettingsResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILES[0]))
    }

    /// Create the configuration directory if needed
    pub fn ensure_config_dir() -> SettingsResult<PathBuf> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Load the first config file found in the config directory, or defaults
    pub fn load_or_default() -> Self {
        let dir = match Self::config_dir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!("{}; using default settings", e);
                return Self::with_config(Config::default());
            }
        };
        Self::load_from_dir(&dir)
    }

    /// Load the first config file found in `dir`, or defaults
    ///
    /// An unreadable or invalid file is logged and replaced by defaults.
    pub fn load_from_dir(dir: &Path) -> Self {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if !path.exists() {
                continue;
            }
            match Config::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded settings from {}", path.display());
                    return Self {
                        config,
                        source: Some(path),
                    };
                }
                Err(e) => warn!("Ignoring {}: {}", path.display(), e),
            }
        }
        Self::with_config(Config::default())
    }

    /// Load an explicit file; errors are returned rather than defaulted
    pub fn load_file(path: &Path) -> SettingsResult<Self> {
        let config = Config::load_from_file(path)?;
        Ok(Self {
            config,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            source: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// File the configuration came from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Database path: configured value or `<data dir>/projects.db`
    pub fn database_path(&self) -> SettingsResult<PathBuf> {
        match &self.config.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join(DATABASE_FILE)),
        }
    }

    /// Write the configuration back to its source, or to the default path
    pub fn save(&self) -> SettingsResult<PathBuf> {
        let path = match &self.source {
            Some(path) => path.clone(),
            None => {
                Self::ensure_config_dir()?;
                Self::config_file_path()?
            }
        };
        self.config.save_to_file(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_from_empty_dir_uses_defaults() {
        let dir = tempdir().unwrap();
        let manager = SettingsManager::load_from_dir(dir.path());
        assert_eq!(manager.config(), &Config::default());
        assert!(manager.source().is_none());
    }

    #[test]
    fn test_toml_takes_precedence_over_json() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[optimizer]\nprogram = \"python3\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"optimizer": {"program": "pypy"}}"#,
        )
        .unwrap();

        let manager = SettingsManager::load_from_dir(dir.path());
        assert_eq!(manager.config().optimizer.program, "python3");
        assert_eq!(manager.source(), Some(dir.path().join("config.toml").as_path()));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[viewer]\nfov = 0.0\n").unwrap();

        let manager = SettingsManager::load_from_dir(dir.path());
        assert_eq!(manager.config().viewer.fov, 75.0);
    }

    #[test]
    fn test_explicit_database_path() {
        let mut config = Config::default();
        config.database.path = Some(PathBuf::from("/tmp/topokit-test.db"));
        let manager = SettingsManager::with_config(config);
        assert_eq!(
            manager.database_path().unwrap(),
            PathBuf::from("/tmp/topokit-test.db")
        );
    }
}
