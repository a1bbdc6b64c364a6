//! Configuration types for rulegate.

use crate::enforcement::{EnforcementMode, EnforcementSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default rules directory, relative to the workspace root.
pub const DEFAULT_RULES_PATH: &str = ".agent/rules";

/// Default on-change debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Default cap on files visited by a bulk scan.
pub const DEFAULT_MAX_FILES: usize = 2000;

/// Top-level configuration for rulegate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Save-time enforcement settings.
    #[serde(default)]
    pub enforcement: EnforcementConfig,

    /// Scanning and rule loading settings.
    #[serde(default)]
    pub scan: ScanConfig,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }
}

/// `[enforcement]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementConfig {
    /// Master switch for save-time enforcement.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Mode at startup.
    #[serde(default)]
    pub mode: EnforcementMode,

    /// Block writes while error findings exist.
    #[serde(default = "default_true")]
    pub block_on_errors: bool,

    /// Block writes while warning findings exist.
    #[serde(default)]
    pub block_on_warnings: bool,

    /// Offer an override path when a write is blocked.
    #[serde(default = "default_true")]
    pub allow_override: bool,

    /// Require a non-empty reason for overrides.
    #[serde(default)]
    pub require_override_reason: bool,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: EnforcementMode::default(),
            block_on_errors: true,
            block_on_warnings: false,
            allow_override: true,
            require_override_reason: false,
        }
    }
}

impl EnforcementConfig {
    /// The operator-adjustable part of this section.
    #[must_use]
    pub fn settings(&self) -> EnforcementSettings {
        EnforcementSettings {
            enabled: self.enabled,
            block_on_errors: self.block_on_errors,
            block_on_warnings: self.block_on_warnings,
            allow_override: self.allow_override,
            require_override_reason: self.require_override_reason,
        }
    }
}

/// `[scan]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Rules directory, relative to the workspace root.
    #[serde(default = "default_rules_path")]
    pub rules_path: PathBuf,

    /// On-change debounce interval in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Cap on files visited by a bulk scan.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Globs that are scanned even inside skipped directories.
    #[serde(default)]
    pub include: Vec<String>,

    /// Extra globs excluded from bulk scans.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rules_path: default_rules_path(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_files: DEFAULT_MAX_FILES,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

fn default_rules_path() -> PathBuf {
    PathBuf::from(DEFAULT_RULES_PATH)
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

fn default_true() -> bool {
    true
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },
}
