//! On-disk location of the versions registry and first-run bootstrap
//!
//! An explicit override path is used as-is and never bootstrapped. The default
//! path is seeded once from the embedded registry when absent; an existing
//! file is never overwritten.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::error::{RegistryError, Result};
use crate::loader;
use crate::schema::Registry;

/// Registry compiled into the binary, installed when the default path is empty
pub const EMBEDDED_REGISTRY: &str = include_str!("../data/1password-cli-versions.yaml");

/// The embedded registry, parsed and validated
pub fn embedded_default() -> Result<Registry> {
    let registry = parse_embedded(EMBEDDED_REGISTRY)?;
    Ok(registry.into_normalized())
}

fn parse_embedded(content: &str) -> Result<Registry> {
    let registry: Registry =
        serde_yaml_ng::from_str(content).map_err(RegistryError::EmbeddedParse)?;
    if let Err(violations) = registry.validate() {
        let err = RegistryError::EmbeddedDefault(violations);
        err.log_if_security_critical();
        return Err(err);
    }
    Ok(registry)
}

/// Where the registry lives and how it got there
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryLocation {
    /// Named by `OP_SECRETS_ACTION_VERSIONS_FILE`
    Override(PathBuf),
    /// Under the OS config root
    Default(PathBuf),
}

impl RegistryLocation {
    pub fn path(&self) -> &Path {
        match self {
            RegistryLocation::Override(path) | RegistryLocation::Default(path) => path,
        }
    }
}

/// Result of [`RegistryStore::bootstrap_if_missing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The embedded registry was written
    Installed,
    /// A registry already existed; nothing was written
    AlreadyPresent,
    /// An override is configured; bootstrap does not apply
    SkippedOverride,
}

/// Resolves, seeds and loads the versions registry
#[derive(Debug, Clone)]
pub struct RegistryStore {
    location: RegistryLocation,
}

impl RegistryStore {
    /// Store for the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_settings(&Settings::load()?)
    }

    /// Override path first, then the default path under the config root
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let location = match &settings.versions_file {
            Some(path) => RegistryLocation::Override(path.clone()),
            None => RegistryLocation::Default(settings.default_registry_path()?),
        };
        tracing::debug!(?location, "resolved versions registry location");
        Ok(Self { location })
    }

    /// Store reading an explicit registry file
    pub fn with_override(path: impl Into<PathBuf>) -> Self {
        Self {
            location: RegistryLocation::Override(path.into()),
        }
    }

    /// Store using `path` as the bootstrappable default location
    pub fn at_default(path: impl Into<PathBuf>) -> Self {
        Self {
            location: RegistryLocation::Default(path.into()),
        }
    }

    pub fn location(&self) -> &RegistryLocation {
        &self.location
    }

    /// Path of the registry file; not checked for existence
    pub fn resolve_path(&self) -> &Path {
        self.location.path()
    }

    /// Install the embedded registry at the default path if nothing is there
    pub fn bootstrap_if_missing(&self) -> Result<BootstrapOutcome> {
        match &self.location {
            RegistryLocation::Override(_) => Ok(BootstrapOutcome::SkippedOverride),
            RegistryLocation::Default(path) => install_if_missing(path, EMBEDDED_REGISTRY),
        }
    }

    /// Load the registry file without bootstrapping
    pub fn load(&self) -> Result<Registry> {
        loader::load(self.resolve_path())
    }

    /// Bootstrap if applicable, then load
    pub fn load_or_bootstrap(&self) -> Result<Registry> {
        self.bootstrap_if_missing()?;
        self.load()
    }
}

fn exists(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(RegistryError::Stat {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn install_if_missing(path: &Path, content: &str) -> Result<BootstrapOutcome> {
    if exists(path)? {
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    // Nothing touches the filesystem until the seed validates.
    parse_embedded(content)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    create_private_dir(dir).map_err(|source| RegistryError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    write_new_private_file(path, dir, content)
}

fn write_new_private_file(path: &Path, dir: &Path, content: &str) -> Result<BootstrapOutcome> {
    let write_err = |source: io::Error| RegistryError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".versions-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    set_private_file_mode(tmp.path()).map_err(write_err)?;

    match tmp.persist_noclobber(path) {
        Ok(_) => {
            tracing::info!(path = %path.display(), "installed bundled versions registry");
            Ok(BootstrapOutcome::Installed)
        }
        Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "versions registry appeared concurrently");
            Ok(BootstrapOutcome::AlreadyPresent)
        }
        Err(err) => Err(write_err(err.error)),
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn set_private_file_mode(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_private_file_mode(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformKey;
    use tempfile::tempdir;

    #[test]
    fn test_embedded_default_is_valid() {
        let registry = embedded_default().unwrap();
        assert_eq!(registry.versions(), vec!["2.31.1"]);
        let checksums = registry.get("2.31.1").unwrap();
        assert_eq!(checksums.populated().count(), PlatformKey::ALL.len());
    }

    #[test]
    fn test_bootstrap_installs_then_noops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1password-secrets/action/versions.yaml");
        let store = RegistryStore::at_default(&path);

        assert_eq!(store.bootstrap_if_missing().unwrap(), BootstrapOutcome::Installed);
        let first = fs::read(&path).unwrap();
        assert_eq!(first, EMBEDDED_REGISTRY.as_bytes());

        assert_eq!(store.bootstrap_if_missing().unwrap(), BootstrapOutcome::AlreadyPresent);
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_bootstrap_never_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("versions.yaml");
        fs::write(&path, "user managed\n").unwrap();

        let store = RegistryStore::at_default(&path);
        assert_eq!(store.bootstrap_if_missing().unwrap(), BootstrapOutcome::AlreadyPresent);
        assert_eq!(fs::read_to_string(&path).unwrap(), "user managed\n");
    }

    #[test]
    fn test_override_skips_bootstrap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let store = RegistryStore::with_override(&path);

        assert_eq!(store.bootstrap_if_missing().unwrap(), BootstrapOutcome::SkippedOverride);
        assert!(!path.exists());
        assert!(matches!(store.load_or_bootstrap(), Err(RegistryError::Read { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_seed_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/versions.yaml");
        let seed = "schema_version: 2\nversions: {}\n";

        let err = install_if_missing(&path, seed).unwrap_err();
        assert_eq!(err.validation().map(|v| v.len()), Some(2));
        assert!(!dir.path().join("nested").exists());

        let err = install_if_missing(&path, "versions: [").unwrap_err();
        assert!(matches!(err, RegistryError::EmbeddedParse(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let config_dir = dir.path().join("1password-secrets/action");
        let path = config_dir.join("versions.yaml");
        RegistryStore::at_default(&path).bootstrap_if_missing().unwrap();

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        let dir_mode = fs::metadata(&config_dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("versions.yaml");
        RegistryStore::at_default(&path).bootstrap_if_missing().unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("versions.yaml")]);
    }

    #[test]
    fn test_from_settings_precedence() {
        let settings = Settings::default()
            .with_config_root("/home/ci/.config")
            .with_versions_file("/srv/versions.yaml");
        let store = RegistryStore::from_settings(&settings).unwrap();
        assert_eq!(
            store.location(),
            &RegistryLocation::Override(PathBuf::from("/srv/versions.yaml"))
        );

        let store = RegistryStore::from_settings(&Settings::default().with_config_root("/home/ci/.config"))
            .unwrap();
        assert!(matches!(store.location(), RegistryLocation::Default(_)));
        assert!(store.resolve_path().ends_with("1password-secrets/action/1password-cli-versions.yaml"));
    }
}
