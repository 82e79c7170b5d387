// src/config.rs
//! Configuration management

use crate::{
    error::{GpsError, Result},
    pipeline::{DEFAULT_COMMAND_QUEUE_CAPACITY, DEFAULT_SENTENCE_QUEUE_CAPACITY},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub serial_port: String,
    pub baudrate: u32,
    pub output_dir: PathBuf,
    pub sentence_queue_capacity: usize,
    pub command_queue_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl RecorderConfig {
    /// Get platform-specific default configuration
    pub fn platform_default() -> Self {
        #[cfg(windows)]
        let serial_port = "COM3".to_string();

        #[cfg(not(windows))]
        let serial_port = "/dev/ttyUSB0".to_string();

        Self {
            serial_port,
            baudrate: 115200,
            output_dir: PathBuf::from("."),
            sentence_queue_capacity: DEFAULT_SENTENCE_QUEUE_CAPACITY,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
        }
    }

    /// Load configuration from the user config file
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to the user config file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    /// Load from a config file, falling back to defaults if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::platform_default());
        }

        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| GpsError::Other(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save to a config file, creating its directory if needed
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GpsError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(config_path, contents)
            .map_err(|e| GpsError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get config file path
    fn get_config_path() -> Result<PathBuf> {
        #[cfg(windows)]
        let home = std::env::var("APPDATA")
            .map_err(|_| GpsError::Other("APPDATA environment variable not set".to_string()))?;

        #[cfg(not(windows))]
        let home = std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .map_err(|_| GpsError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join("stake-logger").join("config.json"))
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.serial_port = port;
        self.baudrate = baudrate;
    }

    /// Update the directory the logs are created in
    pub fn update_output_dir(&mut self, dir: PathBuf) {
        self.output_dir = dir;
    }
}
