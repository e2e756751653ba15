//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults shipped in `config/default.toml`.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, RouterError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub standard: StandardConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

/// Frame loop configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DispatcherConfig {
    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,

    /// Frames between two statistics log lines.
    #[serde(default = "default_stats_interval_frames")]
    pub stats_interval_frames: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files. Empty disables file logging.
    #[serde(default)]
    pub log_dir: String,
}

/// Standard virtual controller configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StandardConfig {
    #[serde(default = "default_standard_enabled")]
    pub enabled: bool,

    #[serde(default = "default_look_sensitivity")]
    pub look_sensitivity: f32,

    #[serde(default)]
    pub invert_look_y: bool,
}

/// Control trace configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TraceConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_trace_path")]
    pub path: String,

    /// Name of the controller whose control events are traced.
    #[serde(default = "default_trace_controller")]
    pub controller: String,
}

// Default value functions
fn default_frame_rate_hz() -> u32 { 60 }
fn default_stats_interval_frames() -> u64 { 600 }

fn default_log_level() -> String { "info".to_string() }

fn default_standard_enabled() -> bool { true }
fn default_look_sensitivity() -> f32 { 1.0 }

fn default_trace_path() -> String { "./logs/controls.jsonl".to_string() }
fn default_trace_controller() -> String { "Standard".to_string() }

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: default_frame_rate_hz(),
            stats_interval_frames: default_stats_interval_frames(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl Default for StandardConfig {
    fn default() -> Self {
        Self {
            enabled: default_standard_enabled(),
            look_sensitivity: default_look_sensitivity(),
            invert_look_y: false,
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_trace_path(),
            controller: default_trace_controller(),
        }
    }
}

/// Accepted values of `logging.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

fn invalid(message: impl std::fmt::Display) -> RouterError {
    RouterError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use input_router::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.dispatcher.frame_rate_hz == 0 || self.dispatcher.frame_rate_hz > 1000 {
            return Err(invalid("frame_rate_hz must be between 1 and 1000"));
        }

        if self.dispatcher.stats_interval_frames == 0 {
            return Err(invalid("stats_interval_frames must be greater than 0"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                LOG_LEVELS.join(", ")
            )));
        }

        let sensitivity = self.standard.look_sensitivity;
        if !(sensitivity > 0.0 && sensitivity <= 100.0) {
            return Err(invalid("look_sensitivity must be greater than 0.0 and at most 100.0"));
        }

        if self.trace.enabled {
            if self.trace.path.is_empty() {
                return Err(invalid("trace path cannot be empty when enabled"));
            }
            if self.trace.controller.is_empty() {
                return Err(invalid("trace controller cannot be empty when enabled"));
            }
        }

        Ok(())
    }
}
