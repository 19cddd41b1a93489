//! Error types for the checksum registry

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::platform::PlatformKey;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Checksum registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unsupported platform: {os}_{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("unsupported CLI version: {version}")]
    UnsupportedVersion { version: String },

    #[error("versions registry at {path} is invalid: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("embedded versions registry failed validation: {0}")]
    EmbeddedDefault(#[source] ValidationError),

    #[error("embedded versions registry is invalid YAML: {0}")]
    EmbeddedParse(#[source] serde_yaml_ng::Error),

    #[error("failed to read versions registry at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML versions registry at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("failed to stat versions registry at {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write versions registry to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to determine config directory ({0})")]
    ConfigDir(&'static str),

    #[error("configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl RegistryError {
    /// The aggregate validation failure carried by this error, if any
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            RegistryError::Invalid { source, .. } => Some(source),
            RegistryError::EmbeddedDefault(source) => Some(source),
            _ => None,
        }
    }

    /// Log failures that mean a binary or registry cannot be trusted
    pub fn log_if_security_critical(&self) {
        match self {
            RegistryError::DigestMismatch { .. } => {
                tracing::warn!(target: "security", "INTEGRITY VIOLATION: {}", self);
            }
            RegistryError::EmbeddedDefault(_) => {
                tracing::error!(target: "security", "INTEGRITY VIOLATION: {}", self);
            }
            _ => {}
        }
    }
}

/// A single schema or content rule broken by a registry document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    SchemaVersion { found: i64, expected: i64 },
    EmptyVersions,
    InvalidVersionKey { key: String },
    DuplicateVersionKey { key: String, normalized: String },
    InvalidChecksum { version: String, platform: PlatformKey },
    NoChecksums { version: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::SchemaVersion { found, expected } => {
                write!(f, "unexpected schema_version={} (expected {})", found, expected)
            }
            Violation::EmptyVersions => write!(f, "versions map is empty"),
            Violation::InvalidVersionKey { key } => write!(
                f,
                "invalid version key '{}' (expected semantic version like 2.31.1)",
                key
            ),
            Violation::DuplicateVersionKey { key, normalized } => write!(
                f,
                "duplicate version key '{}' (normalizes to '{}', already defined)",
                key, normalized
            ),
            Violation::InvalidChecksum { version, platform } => write!(
                f,
                "version {}: invalid {} checksum (must be 64 hex chars)",
                version, platform
            ),
            Violation::NoChecksums { version } => {
                write!(f, "version {}: no platform checksums provided", version)
            }
        }
    }
}

/// Every violation found in one validation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return write!(f, "schema validation failed");
        }
        write!(f, "schema validation failed: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn captured_log(err: &RegistryError) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || err.log_if_security_critical());
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_digest_mismatch_logs_warning() {
        let err = RegistryError::DigestMismatch {
            path: PathBuf::from("/tmp/op"),
            expected: "a".repeat(64),
            actual: "b".repeat(64),
        };
        let log = captured_log(&err);
        assert!(log.contains("WARN"), "{}", log);
        assert!(log.contains("INTEGRITY VIOLATION"), "{}", log);
    }

    #[test]
    fn test_ordinary_errors_are_not_logged() {
        let log = captured_log(&RegistryError::UnsupportedVersion {
            version: "9.9.9".into(),
        });
        assert!(log.is_empty(), "{}", log);
    }

    #[test]
    fn test_aggregate_message_lists_every_violation() {
        let err = ValidationError::new(vec![
            Violation::SchemaVersion { found: 2, expected: 1 },
            Violation::NoChecksums { version: "9.9.9".to_string() },
        ]);
        assert_eq!(
            err.to_string(),
            "schema validation failed: unexpected schema_version=2 (expected 1); \
             version 9.9.9: no platform checksums provided"
        );
    }

    #[test]
    fn test_invalid_checksum_message_names_platform() {
        let v = Violation::InvalidChecksum {
            version: "2.31.1".to_string(),
            platform: PlatformKey::DarwinArm64,
        };
        assert_eq!(
            v.to_string(),
            "version 2.31.1: invalid darwin_arm64 checksum (must be 64 hex chars)"
        );
    }

    #[test]
    fn test_validation_accessor() {
        let err = RegistryError::Invalid {
            path: PathBuf::from("/tmp/versions.yaml"),
            source: ValidationError::new(vec![Violation::EmptyVersions]),
        };
        assert_eq!(err.validation().map(|v| v.len()), Some(1));
        assert!(RegistryError::ConfigDir("no home").validation().is_none());
    }
}
