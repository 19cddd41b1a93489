//! Versions registry document and validation
//!
//! ```yaml
//! schema_version: 1
//! generated_at: "2025-07-28T00:00:00Z"
//! versions:
//!   "2.31.1":
//!     linux_amd64: "<64 hex chars>"
//!     darwin_arm64: "<64 hex chars>"
//! ```
//!
//! Unknown keys are ignored. Validation is exhaustive: every violation in the
//! document is collected before reporting.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::checksum::is_sha256_hex;
use crate::error::{ValidationError, Violation};
use crate::platform::PlatformKey;
use crate::version::{is_release_version, normalize_version};

/// The only schema revision this crate understands
pub const SCHEMA_VERSION: i64 = 1;

/// Root of the versions registry document.
///
/// Fields are read through accessors; entries change only via
/// [`extend`](Registry::extend), which validates before merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RegistryDocument")]
pub struct Registry {
    pub(crate) schema_version: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) generated_at: Option<String>,

    pub(crate) versions: BTreeMap<String, PlatformChecksums>,

    /// Later occurrences of a key already present in `versions`
    #[serde(skip)]
    pub(crate) repeated: Vec<(String, PlatformChecksums)>,
}

/// Per-platform SHA256 checksums for one CLI version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformChecksums {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_amd64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_arm64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub darwin_amd64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub darwin_arm64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_amd64: Option<String>,
}

/// The document as written, before repeated keys are set aside
#[derive(Deserialize)]
struct RegistryDocument {
    /// Missing in the document reads as 0 and fails validation
    #[serde(default)]
    schema_version: i64,
    #[serde(default)]
    generated_at: Option<String>,
    #[serde(default)]
    versions: Option<VersionEntries>,
}

/// Every `versions` entry in document order, repeats included.
///
/// A version key with no body (`"9.9.9":`) is an entry with no checksums,
/// not a parse error.
struct VersionEntries(Vec<(String, PlatformChecksums)>);

impl<'de> Deserialize<'de> for VersionEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = VersionEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of version keys to platform checksums")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((version, checksums)) =
                    map.next_entry::<String, Option<PlatformChecksums>>()?
                {
                    entries.push((version, checksums.unwrap_or_default()));
                }
                Ok(VersionEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl From<RegistryDocument> for Registry {
    fn from(document: RegistryDocument) -> Self {
        let mut versions = BTreeMap::new();
        let mut repeated = Vec::new();
        for (version, checksums) in document.versions.map(|v| v.0).unwrap_or_default() {
            if versions.contains_key(&version) {
                repeated.push((version, checksums));
            } else {
                versions.insert(version, checksums);
            }
        }
        Registry {
            schema_version: document.schema_version,
            generated_at: document.generated_at,
            versions,
            repeated,
        }
    }
}

impl PlatformChecksums {
    fn slot(&self, platform: PlatformKey) -> &Option<String> {
        match platform {
            PlatformKey::LinuxAmd64 => &self.linux_amd64,
            PlatformKey::LinuxArm64 => &self.linux_arm64,
            PlatformKey::DarwinAmd64 => &self.darwin_amd64,
            PlatformKey::DarwinArm64 => &self.darwin_arm64,
            PlatformKey::WindowsAmd64 => &self.windows_amd64,
        }
    }

    fn slot_mut(&mut self, platform: PlatformKey) -> &mut Option<String> {
        match platform {
            PlatformKey::LinuxAmd64 => &mut self.linux_amd64,
            PlatformKey::LinuxArm64 => &mut self.linux_arm64,
            PlatformKey::DarwinAmd64 => &mut self.darwin_amd64,
            PlatformKey::DarwinArm64 => &mut self.darwin_arm64,
            PlatformKey::WindowsAmd64 => &mut self.windows_amd64,
        }
    }

    /// The checksum for `platform`, if present and non-blank
    pub fn get(&self, platform: PlatformKey) -> Option<&str> {
        self.slot(platform)
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    /// Set the checksum for `platform`
    pub fn set(&mut self, platform: PlatformKey, checksum: impl Into<String>) {
        *self.slot_mut(platform) = Some(checksum.into());
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, platform: PlatformKey, checksum: impl Into<String>) -> Self {
        self.set(platform, checksum);
        self
    }

    /// Platforms with a non-blank checksum, in document order
    pub fn populated(&self) -> impl Iterator<Item = (PlatformKey, &str)> + '_ {
        PlatformKey::ALL
            .into_iter()
            .filter_map(move |platform| self.get(platform).map(|value| (platform, value)))
    }

    fn validate_into(&self, version: &str, violations: &mut Vec<Violation>) {
        let mut populated = 0;
        for (platform, value) in self.populated() {
            populated += 1;
            if !is_sha256_hex(value) {
                violations.push(Violation::InvalidChecksum {
                    version: version.to_string(),
                    platform,
                });
            }
        }
        if populated == 0 {
            violations.push(Violation::NoChecksums {
                version: version.to_string(),
            });
        }
    }
}

impl Registry {
    /// Schema revision declared by the document
    pub fn schema_version(&self) -> i64 {
        self.schema_version
    }

    /// Informational generation timestamp, if any
    pub fn generated_at(&self) -> Option<&str> {
        self.generated_at.as_deref()
    }

    /// Every version entry, keyed as stored
    pub fn entries(&self) -> impl Iterator<Item = (&str, &PlatformChecksums)> + '_ {
        self.versions
            .iter()
            .map(|(version, checksums)| (version.as_str(), checksums))
    }

    /// Validate every rule and report all violations at once
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if self.schema_version != SCHEMA_VERSION {
            violations.push(Violation::SchemaVersion {
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }

        if self.versions.is_empty() {
            violations.push(Violation::EmptyVersions);
        }

        let mut seen = BTreeSet::new();
        for (key, checksums) in &self.versions {
            let normalized = normalize_version(key);
            if !is_release_version(&normalized) {
                violations.push(Violation::InvalidVersionKey { key: key.clone() });
            } else if !seen.insert(normalized.clone()) {
                violations.push(Violation::DuplicateVersionKey {
                    key: key.clone(),
                    normalized,
                });
            }
            checksums.validate_into(key, &mut violations);
        }

        for (key, checksums) in &self.repeated {
            violations.push(Violation::DuplicateVersionKey {
                key: key.clone(),
                normalized: normalize_version(key),
            });
            checksums.validate_into(key, &mut violations);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }
}
