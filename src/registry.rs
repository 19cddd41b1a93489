//! Lookup and in-memory extension of a loaded versions registry

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};

use crate::error::ValidationError;
use crate::platform::PlatformKey;
use crate::schema::{PlatformChecksums, Registry, SCHEMA_VERSION};
use crate::version::{normalize_version, sorted_versions};

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry at the supported schema revision.
    ///
    /// Empty registries do not validate; populate with [`extend`](Self::extend).
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: None,
            versions: BTreeMap::new(),
            repeated: Vec::new(),
        }
    }

    /// Expected digest for `version` on `platform`.
    ///
    /// A missing version and a missing checksum both return `None`.
    pub fn get_expected_digest(&self, version: &str, platform: PlatformKey) -> Option<&str> {
        self.versions
            .get(&normalize_version(version))
            .and_then(|checksums| checksums.get(platform))
    }

    /// Checksums recorded for `version`
    pub fn get(&self, version: &str) -> Option<&PlatformChecksums> {
        self.versions.get(&normalize_version(version))
    }

    /// Whether `version` has an entry
    pub fn contains(&self, version: &str) -> bool {
        self.get(version).is_some()
    }

    /// Version keys, oldest first
    pub fn versions(&self) -> Vec<&str> {
        sorted_versions(self.versions.keys().map(String::as_str))
    }

    /// Add or replace one version entry.
    ///
    /// The entry is validated on its own first, under the key as given; on
    /// failure the registry is left untouched.
    pub fn extend(
        &mut self,
        version: &str,
        checksums: PlatformChecksums,
    ) -> Result<(), ValidationError> {
        let scratch = Registry {
            versions: BTreeMap::from([(version.to_string(), checksums)]),
            ..Registry::new()
        };
        scratch.validate()?;

        self.versions.extend(scratch.into_normalized().versions);
        Ok(())
    }

    /// Set `generated_at` to the current UTC time
    pub fn stamp_generated_at(&mut self) {
        self.generated_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    /// Serialize to the on-disk YAML form
    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(self)
    }

    /// Rekey every entry by its normalized version.
    ///
    /// Only meaningful on a validated registry, where normalized keys are
    /// unique.
    pub(crate) fn into_normalized(mut self) -> Self {
        let versions = std::mem::take(&mut self.versions);
        self.versions = versions
            .into_iter()
            .map(|(version, checksums)| (normalize_version(&version), checksums))
            .collect();
        self
    }
}
