//! Configuration module for displayctl-rs
//!
//! This module handles framework configuration:
//! - Framework settings (debounce timing, worker pool, error policy, labels, logging)
//! - Per-control property overrides ([`ControlProperties`])
//! - Named display settings ([`DisplaySetting`])
//!
//! # Config Location
//!
//! The framework config is a TOML file in the platform config directory:
//! - **Linux**: `~/.config/displayctl-rs/displayctl.toml`
//! - **macOS**: `~/Library/Application Support/displayctl-rs/displayctl.toml`
//! - **Windows**: `%APPDATA%\displayctl-rs\displayctl.toml`
//!
//! Durable settings (control snapshots, default preferences) live in the app
//! data directory, see [`crate::persistence`].
//!
//! # Example
//!
//! ```toml
//! [debounce]
//! delay_ms = 250
//!
//! [policy]
//! ignore_errors = true
//!
//! [[display_settings]]
//! name = "Cold colors"
//! properties = "colortable=BlueRed;linewidth=2"
//! ```

pub mod properties;

pub use properties::{ControlProperties, DisplaySetting};

use crate::error::{ControlError, Result};
use crate::time::labels::{
    DEFAULT_LEGEND_TEMPLATE, DEFAULT_MENU_TEMPLATE, DEFAULT_TIMESTAMP_FORMAT,
};
use crate::view::DebounceConfig;
use crate::worker::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_THREADS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for config and data directories
pub const APP_ID: &str = "displayctl-rs";

/// Config filename
pub const CONFIG_FILE: &str = "displayctl.toml";

/// Default log filter when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "info,displayctl_rs=debug";

// ==================== Directories ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

// ==================== Sections ====================

/// View-change debounce timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceSettings {
    /// Settle delay in milliseconds
    pub delay_ms: u64,
    /// Relative per-axis bounds tolerance
    pub tolerance: f64,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            delay_ms: 500,
            tolerance: 0.01,
        }
    }
}

impl DebounceSettings {
    pub fn to_config(&self) -> DebounceConfig {
        DebounceConfig {
            delay: Duration::from_millis(self.delay_ms),
            tolerance: self.tolerance,
        }
    }
}

/// Background worker pool sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    pub threads: usize,
    pub queue_capacity: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_WORKER_THREADS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Framework-wide behavior switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    /// Keep controls registered (without data) when data resolution fails
    pub ignore_errors: bool,
    /// Persist the data reference list with control settings
    pub save_data_sources: bool,
    /// New controls consume the view's time-driver sequence by default
    pub use_time_driver: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            ignore_errors: false,
            save_data_sources: true,
            use_time_driver: false,
        }
    }
}

/// Label templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSettings {
    pub legend_template: String,
    pub menu_template: String,
    /// chrono strftime format for `%timestamp%`
    pub timestamp_format: String,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            legend_template: DEFAULT_LEGEND_TEMPLATE.to_string(),
            menu_template: DEFAULT_MENU_TEMPLATE.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Directory for daily rolling log files; `None` logs to stderr only
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            directory: None,
            file_prefix: "displayctl.log".to_string(),
            ansi: true,
        }
    }
}

// ==================== Framework Config ====================

/// Top-level framework configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub debounce: DebounceSettings,
    pub workers: WorkerSettings,
    pub policy: PolicySettings,
    pub labels: LabelSettings,
    pub logging: LoggingConfig,
    /// Named property bundles offered to the UI shell
    pub display_settings: Vec<DisplaySetting>,
}

impl FrameworkConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ControlError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load config from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ControlError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Load from `path` (or the default location), returning defaults on
    /// any error. A missing default file is not an error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match config_path() {
                Some(p) if p.exists() => p,
                _ => return Self::default(),
            },
        };
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ControlError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| ControlError::Config(format!("Failed to write config: {}", e)))
    }

    pub fn display_setting(&self, name: &str) -> Option<&DisplaySetting> {
        self.display_settings.iter().find(|s| s.name == name)
    }
}
