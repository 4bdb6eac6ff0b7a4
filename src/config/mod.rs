//! Configuration module
//!
//! Static relay settings, fixed before the loop starts

mod settings;

pub use settings::{
    CollectorSettings, ConfigError, LoggingConfig, RelayConfig, RelaySettings, SerialSettings,
};

use directories::ProjectDirs;
use std::path::PathBuf;

/// Get the application configuration directory
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "stopwatch-relay", "StopwatchRelay")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the application data directory
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "stopwatch-relay", "StopwatchRelay")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the default log directory
pub fn log_dir() -> Option<PathBuf> {
    data_dir().map(|d| d.join("logs"))
}
