// src/config.rs
//! Configuration management, stored as JSON under the user's config dir

use crate::{
    error::{NavError, Result},
    feed::FeedSource,
    navigation::EngineSettings,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub source_type: String, // "stdin", "serial"
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub arrival_threshold_nm: f64,
    pub distance_interval_ms: u64,
    pub arrival_interval_ms: u64,
    pub crosstrack_interval_ms: u64,
    pub waypoint_alarm_nm: f64,
    pub crosstrack_alarm_nm: f64,
    pub track_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            source_type: "stdin".to_string(),
            serial_port: None,
            serial_baudrate: Some(9600),
            arrival_threshold_nm: 0.02,
            distance_interval_ms: 1000,
            arrival_interval_ms: 1000,
            crosstrack_interval_ms: 1000,
            waypoint_alarm_nm: 0.2,
            crosstrack_alarm_nm: 1.0,
            track_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl NavConfig {
    /// Load configuration from the config file, defaults if it is missing
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| NavError::Other(format!("Failed to read config file: {}", e)))?;

        Self::from_json(&contents)
    }

    /// Save configuration to the config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| NavError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| NavError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| NavError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Get config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| NavError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("route-nav").join("config.json"))
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// Use the same polling interval for every monitor
    pub fn update_intervals(&mut self, interval_ms: u64) {
        self.distance_interval_ms = interval_ms;
        self.arrival_interval_ms = interval_ms;
        self.crosstrack_interval_ms = interval_ms;
    }

    /// Feed source described by this configuration
    pub fn feed_source(&self) -> Result<FeedSource> {
        match self.source_type.as_str() {
            "stdin" => Ok(FeedSource::Stdin),
            "serial" => {
                let port = self.serial_port.clone().ok_or_else(|| {
                    NavError::Other("Serial source selected but no serial_port set".to_string())
                })?;
                Ok(FeedSource::Serial {
                    port,
                    baudrate: self.serial_baudrate.unwrap_or(9600),
                })
            }
            other => Err(NavError::Other(format!("Unknown source type: {}", other))),
        }
    }

    /// Monitor settings; zero intervals are raised to one millisecond
    pub fn engine_settings(&self) -> EngineSettings {
        let interval = |ms: u64| Duration::from_millis(ms.max(1));
        EngineSettings {
            arrival_threshold_nm: self.arrival_threshold_nm,
            distance_interval: interval(self.distance_interval_ms),
            arrival_interval: interval(self.arrival_interval_ms),
            crosstrack_interval: interval(self.crosstrack_interval_ms),
            waypoint_alarm_nm: self.waypoint_alarm_nm,
            crosstrack_alarm_nm: self.crosstrack_alarm_nm,
        }
    }
}
