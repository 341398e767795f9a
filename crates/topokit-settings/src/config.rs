//! Configuration for TopoKit
//!
//! Configuration is organized into sections:
//! - Database location
//! - External optimizer command line
//! - Metrics endpoint
//! - Viewport defaults (camera, controls, render loop)
//!
//! Files are JSON or TOML, chosen by extension.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Database settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Explicit database file; the platform data directory is used when unset
    pub path: Option<PathBuf>,
}

/// External optimizer invocation
///
/// The process is started as `program args... <input> <output>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    pub program: String,
    pub args: Vec<String>,
    /// Output path used by the viewer's optimize action
    pub default_output: String,
    /// Kill the process after this many seconds; no limit when unset
    pub timeout_secs: Option<u64>,
    /// Working directory for the process
    pub working_dir: Option<PathBuf>,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["backend/main.py".to_string()],
            default_output: "optimized_model.stl".to_string(),
            timeout_secs: None,
            working_dir: None,
        }
    }
}

/// Metrics endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Base URL; requests go to `{base_url}/api/metrics/{project_id}`
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Viewport defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Default surface size in pixels
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Delay between render loop frames
    pub frame_interval_ms: u64,
    /// Clear color as RGBA
    pub background: [u8; 4],
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            width: 1200,
            height: 800,
            pixel_ratio: 1.0,
            damping_factor: 0.1,
            rotate_speed: 0.5,
            min_distance: 0.0,
            max_distance: 10_000.0,
            frame_interval_ms: 16,
            background: [0xf0, 0xf0, 0xf0, 0xff],
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub optimizer: OptimizerSettings,
    pub metrics: MetricsSettings,
    pub viewer: ViewerSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_for(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into()),
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from a `.json` or `.toml` file
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_for(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to a `.json` or `.toml` file
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_for(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let viewer = &self.viewer;

        if !(viewer.fov > 0.0 && viewer.fov < 180.0) {
            return Err(out_of_range("viewer.fov", viewer.fov));
        }
        if viewer.near <= 0.0 {
            return Err(out_of_range("viewer.near", viewer.near));
        }
        if viewer.far <= viewer.near {
            return Err(out_of_range("viewer.far", viewer.far));
        }
        if viewer.width == 0 || viewer.height == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "viewer.size".to_string(),
                value: format!("{}x{}", viewer.width, viewer.height),
            });
        }
        if viewer.pixel_ratio <= 0.0 {
            return Err(out_of_range("viewer.pixel_ratio", viewer.pixel_ratio));
        }
        if !(0.0..=1.0).contains(&viewer.damping_factor) {
            return Err(out_of_range("viewer.damping_factor", viewer.damping_factor));
        }
        if viewer.min_distance < 0.0 || viewer.max_distance < viewer.min_distance {
            return Err(out_of_range("viewer.max_distance", viewer.max_distance));
        }
        if viewer.frame_interval_ms == 0 {
            return Err(out_of_range("viewer.frame_interval_ms", 0));
        }

        if self.optimizer.program.trim().is_empty() {
            return Err(ConfigError::MissingValue("optimizer.program".to_string()));
        }
        if self.optimizer.timeout_secs == Some(0) {
            return Err(out_of_range("optimizer.timeout_secs", 0));
        }

        if self.metrics.base_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("metrics.base_url".to_string()));
        }
        if self.metrics.timeout_ms == 0 {
            return Err(out_of_range("metrics.timeout_ms", 0));
        }

        Ok(())
    }
}

fn out_of_range(key: &str, value: impl std::fmt::Display) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.viewer.fov, 75.0);
        assert_eq!(config.viewer.near, 0.1);
        assert_eq!(config.viewer.far, 1000.0);
        assert_eq!(config.optimizer.default_output, "optimized_model.stl");
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.optimizer.program = "python3".to_string();
        config.optimizer.timeout_secs = Some(600);
        config.viewer.max_distance = 250.0;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"metrics": {"base_url": "http://metrics.local"}}"#).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.metrics.base_url, "http://metrics.local");
        assert_eq!(loaded.metrics.timeout_ms, 10_000);
        assert_eq!(loaded.optimizer.program, "python");
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let err = Config::load_from_file(Path::new("settings.yaml")).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Config(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.viewer.near = 5.0;
        config.viewer.far = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.viewer.fov = 180.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.optimizer.program = "  ".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingValue("optimizer.program".to_string()))
        );
    }
}
