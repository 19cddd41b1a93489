//! SHA256 digests for downloaded binaries

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

fn sha256_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-f0-9]{64}$").expect("static regex"))
}

/// Whether `value` is a lowercase hex-encoded SHA256 digest
pub fn is_sha256_hex(value: &str) -> bool {
    sha256_pattern().is_match(value)
}

/// SHA256 checksum, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Compute checksum by streaming a reader to the end
    pub fn from_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// Compute checksum of a file's contents
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| RegistryError::Hash {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file).map_err(|source| RegistryError::Hash {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this checksum equals an expected digest string
    pub fn matches(&self, expected: &str) -> bool {
        self.0 == expected
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash `path` and compare against `expected`.
///
/// Returns the computed checksum on success.
pub fn verify_file(path: &Path, expected: &str) -> Result<Checksum> {
    let actual = Checksum::from_file(path)?;
    if !actual.matches(expected) {
        let err = RegistryError::DigestMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual: actual.0,
        };
        err.log_if_security_critical();
        return Err(err);
    }
    tracing::debug!(path = %path.display(), "checksum verified");
    Ok(actual)
}
