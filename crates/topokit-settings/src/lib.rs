//! TopoKit Settings Crate
//!
//! Handles application configuration: file formats, platform directories and
//! validation.

pub mod config;
pub mod error;
pub mod manager;

pub use config::{
    Config, DatabaseSettings, MetricsSettings, OptimizerSettings, ViewerSettings,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
pub use manager::SettingsManager;
