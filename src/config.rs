//! Configuration for locating the versions registry
//!
//! Sources, in order:
//! - `OP_SECRETS_ACTION_VERSIONS_FILE`: explicit registry path, authoritative
//!   when set and non-blank
//! - the platform config root: `%APPDATA%` on Windows, `$XDG_CONFIG_HOME`
//!   elsewhere, each falling back to a directory under the user's home
//!
//! The default registry lives at
//! `<config root>/1password-secrets/action/1password-cli-versions.yaml`.

use std::path::{Path, PathBuf};

use config_crate::{Config, Environment, Map};
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "OP_SECRETS_ACTION";

/// Full name of the registry path override
pub const VERSIONS_FILE_ENV: &str = "OP_SECRETS_ACTION_VERSIONS_FILE";

/// Registry filename under the config subdirectory
pub const VERSIONS_FILENAME: &str = "1password-cli-versions.yaml";

/// Subdirectory components under the config root
pub const CONFIG_SUBDIR: [&str; 2] = ["1password-secrets", "action"];

/// Resolved settings for the registry store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Explicit registry path; bootstrap is skipped when set
    #[serde(default)]
    pub versions_file: Option<PathBuf>,

    /// Base configuration directory for the default registry path
    #[serde(skip)]
    pub config_root: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the process environment
    pub fn load() -> Result<Self> {
        let mut settings = Self::from_environment(Environment::with_prefix(ENV_PREFIX))?;
        settings.config_root = default_config_root();
        Ok(settings)
    }

    /// Load settings from an explicit variable map instead of the process
    /// environment. `config_root` is left unset.
    pub fn from_source(vars: Map<String, String>) -> Result<Self> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn from_environment(env: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(env.prefix_separator("_").ignore_empty(true))
            .build()?;
        let mut settings: Settings = config.try_deserialize()?;
        settings.versions_file = settings.versions_file.and_then(|path| {
            let trimmed = path.to_string_lossy().trim().to_string();
            (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
        });
        Ok(settings)
    }

    /// Set the config root
    pub fn with_config_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config_root = Some(root.into());
        self
    }

    /// Set the registry override
    pub fn with_versions_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.versions_file = Some(path.into());
        self
    }

    /// The default registry path under the config root
    pub fn default_registry_path(&self) -> Result<PathBuf> {
        let root = self.config_root.as_deref().ok_or(RegistryError::ConfigDir(
            "no APPDATA, XDG_CONFIG_HOME or home directory",
        ))?;
        Ok(registry_path_under(root))
    }
}

/// `<root>/1password-secrets/action/1password-cli-versions.yaml`
pub fn registry_path_under(root: &Path) -> PathBuf {
    let mut path = root.to_path_buf();
    path.extend(CONFIG_SUBDIR);
    path.push(VERSIONS_FILENAME);
    path
}

/// The OS-conventional configuration root for the current user
pub fn default_config_root() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        non_blank_env("APPDATA")
            .or_else(|| home_dir().map(|home| home.join("AppData").join("Roaming")))
    }

    #[cfg(not(windows))]
    {
        non_blank_env("XDG_CONFIG_HOME").or_else(|| home_dir().map(|home| home.join(".config")))
    }
}

fn non_blank_env(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.to_string_lossy().trim().is_empty())
        .map(PathBuf::from)
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}
