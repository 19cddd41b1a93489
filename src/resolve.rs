//! Expected-digest resolution for callers about to trust a CLI binary

use std::path::Path;

use crate::checksum::{verify_file, Checksum};
use crate::error::{RegistryError, Result};
use crate::platform::PlatformKey;
use crate::schema::Registry;
use crate::store::RegistryStore;
use crate::version::normalize_version;

/// Expected digest for `version` on `platform`, read through `store`.
///
/// Bootstraps the default registry if needed. A registry without a usable
/// checksum yields [`RegistryError::UnsupportedVersion`].
pub fn expected_digest(
    store: &RegistryStore,
    version: &str,
    platform: PlatformKey,
) -> Result<String> {
    let registry = store.load_or_bootstrap()?;
    lookup(&registry, version, platform)
}

/// Expected digest for `version` on the running host.
///
/// Configuration comes from the process environment.
pub fn expected_digest_for_current_platform(version: &str) -> Result<String> {
    let store = RegistryStore::from_env()?;
    let registry = store.load_or_bootstrap()?;
    let platform = PlatformKey::current()?;
    lookup(&registry, version, platform)
}

fn lookup(registry: &Registry, version: &str, platform: PlatformKey) -> Result<String> {
    registry
        .get_expected_digest(version, platform)
        .map(str::to_string)
        .ok_or_else(|| RegistryError::UnsupportedVersion {
            version: normalize_version(version),
        })
}

/// Check a downloaded binary against the registry for `version` on `platform`
pub fn verify_binary(
    store: &RegistryStore,
    version: &str,
    platform: PlatformKey,
    binary: &Path,
) -> Result<Checksum> {
    let expected = expected_digest(store, version, platform)?;
    verify_file(binary, &expected)
}

/// Check a downloaded binary for the running host
pub fn verify_binary_for_current_platform(version: &str, binary: &Path) -> Result<Checksum> {
    let expected = expected_digest_for_current_platform(version)?;
    verify_file(binary, &expected)
}
