//! Locates the `rulegate.toml` that applies to a project.
//!
//! First match wins:
//!
//! 1. `--config <file>`
//! 2. `rulegate.toml`, then `.rulegate.toml`, in the project directory
//! 3. `config.toml` in `$RULEGATE_CONFIG_DIR`, else in `~/.rulegate/`
//! 4. built-in defaults

use anyhow::{Context, Result};
use rulegate_core::Config;
use std::path::{Path, PathBuf};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the per-user config directory.
    Global(PathBuf),
    /// Nothing found.
    Default,
}

impl ConfigSource {
    /// Resolved file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }

    /// Reads the resolved file, or returns defaults.
    pub fn load(&self) -> Result<Config> {
        let Some(path) = self.path() else {
            return Ok(Config::default());
        };
        if matches!(self, Self::Global(_)) {
            tracing::info!("Using global config: {}", path.display());
        }
        Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
    }
}

const PROJECT_CONFIG_NAMES: &[&str] = &["rulegate.toml", ".rulegate.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Resolves the configuration for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_in(project_dir, explicit, global_config_dir().as_deref())
}

fn resolve_in(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<&Path>) -> ConfigSource {
    if let Some(path) = explicit {
        // Trusted as given; a missing file surfaces when loading.
        return ConfigSource::Explicit(path.to_path_buf());
    }

    if let Some(found) = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.is_file())
    {
        tracing::debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    match global_dir.map(|dir| dir.join(GLOBAL_CONFIG_NAME)) {
        Some(candidate) if candidate.is_file() => {
            tracing::debug!("Found global config: {}", candidate.display());
            ConfigSource::Global(candidate)
        }
        _ => ConfigSource::Default,
    }
}

/// `$RULEGATE_CONFIG_DIR`, else `~/.rulegate`.
fn global_config_dir() -> Option<PathBuf> {
    std::env::var_os("RULEGATE_CONFIG_DIR")
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".rulegate")))
}
