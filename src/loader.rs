//! Reading and validating a versions registry from disk

use std::fs;
use std::path::Path;

use crate::error::{RegistryError, Result};
use crate::schema::Registry;

/// Read, parse and validate the registry at `path`.
///
/// Keys of the returned registry are normalized. Nothing is returned unless
/// the whole document validates.
pub fn load(path: &Path) -> Result<Registry> {
    tracing::debug!(path = %path.display(), "loading versions registry");
    let content = fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content, path)
}

/// Parse and validate registry YAML that was read from `origin`
pub fn parse(content: &str, origin: &Path) -> Result<Registry> {
    let registry: Registry =
        serde_yaml_ng::from_str(content).map_err(|source| RegistryError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

    registry.validate().map_err(|source| RegistryError::Invalid {
        path: origin.to_path_buf(),
        source,
    })?;

    Ok(registry.into_normalized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformKey;
    use std::path::PathBuf;

    const DIGEST: &str = "47bcd4dbeacefcd01ae8c913e61721ae71ac4f6a0b9150f48467ff719d494ff7";

    fn origin() -> PathBuf {
        PathBuf::from("/etc/versions.yaml")
    }

    #[test]
    fn test_parse_normalizes_keys() {
        let yaml = format!("schema_version: 1\nversions:\n  \"v2.31.1\":\n    linux_arm64: \"{DIGEST}\"\n");
        let registry = parse(&yaml, &origin()).unwrap();
        assert_eq!(registry.versions(), vec!["2.31.1"]);
        assert_eq!(
            registry.get_expected_digest("2.31.1", PlatformKey::LinuxArm64),
            Some(DIGEST)
        );
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = parse("schema_version: [1\n", &origin()).unwrap_err();
        match err {
            RegistryError::Parse { path, .. } => assert_eq!(path, origin()),
            other => panic!("expected Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let err = parse("schema_version: one\nversions: {}\n", &origin()).unwrap_err();
        assert!(matches!(err, RegistryError::Parse { .. }));
    }

    #[test]
    fn test_validation_failure_names_path() {
        let yaml = format!("schema_version: 2\nversions:\n  \"2.31.1\":\n    linux_arm64: \"{DIGEST}\"\n");
        let err = parse(&yaml, &origin()).unwrap_err();
        assert!(err.to_string().contains("/etc/versions.yaml"));
        assert!(err.to_string().contains("unexpected schema_version=2"));
        assert_eq!(err.validation().map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        match load(&path).unwrap_err() {
            RegistryError::Read { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected Read, got {:?}", other),
        }
    }
}
