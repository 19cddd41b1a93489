//! Platform keys for the versions registry
//!
//! The table is closed: linux and darwin on amd64/arm64, windows on amd64.
//! Anything else is an unsupported platform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

const LINUX: &str = "linux";
const DARWIN: &str = "darwin";
const WINDOWS: &str = "windows";
const AMD64: &str = "amd64";
const ARM64: &str = "arm64";

/// A supported OS/architecture pair, as keyed in the registry document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKey {
    LinuxAmd64,
    LinuxArm64,
    DarwinAmd64,
    DarwinArm64,
    WindowsAmd64,
}

impl PlatformKey {
    /// Every supported key, in document order
    pub const ALL: [PlatformKey; 5] = [
        PlatformKey::LinuxAmd64,
        PlatformKey::LinuxArm64,
        PlatformKey::DarwinAmd64,
        PlatformKey::DarwinArm64,
        PlatformKey::WindowsAmd64,
    ];

    /// Map raw OS/architecture identifiers onto a key.
    ///
    /// Identifiers use the registry vocabulary (`linux`, `darwin`, `windows`;
    /// `amd64`, `arm64`). There is no fuzzy matching.
    pub fn resolve(os: &str, arch: &str) -> Result<Self> {
        match (os, arch) {
            (LINUX, AMD64) => Ok(PlatformKey::LinuxAmd64),
            (LINUX, ARM64) => Ok(PlatformKey::LinuxArm64),
            (DARWIN, AMD64) => Ok(PlatformKey::DarwinAmd64),
            (DARWIN, ARM64) => Ok(PlatformKey::DarwinArm64),
            (WINDOWS, AMD64) => Ok(PlatformKey::WindowsAmd64),
            _ => Err(RegistryError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// The key for the running host
    pub fn current() -> Result<Self> {
        let (os, arch) = host_identifiers();
        Self::resolve(os, arch)
    }

    /// The key as written in the registry document
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKey::LinuxAmd64 => "linux_amd64",
            PlatformKey::LinuxArm64 => "linux_arm64",
            PlatformKey::DarwinAmd64 => "darwin_amd64",
            PlatformKey::DarwinArm64 => "darwin_arm64",
            PlatformKey::WindowsAmd64 => "windows_amd64",
        }
    }
}

impl fmt::Display for PlatformKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformKey {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        PlatformKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                let (os, arch) = s.split_once('_').unwrap_or((s, ""));
                RegistryError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                }
            })
    }
}

/// The running host's OS and architecture in registry vocabulary.
///
/// Unknown values pass through unchanged so that [`PlatformKey::resolve`]
/// reports them verbatim.
pub fn host_identifiers() -> (&'static str, &'static str) {
    (
        os_identifier(std::env::consts::OS),
        arch_identifier(std::env::consts::ARCH),
    )
}

fn os_identifier(os: &'static str) -> &'static str {
    match os {
        "macos" => DARWIN,
        other => other,
    }
}

fn arch_identifier(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => AMD64,
        "aarch64" => ARM64,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSES: [&str; 5] = ["linux", "darwin", "windows", "freebsd", ""];
    const ARCHES: [&str; 5] = ["amd64", "arm64", "386", "riscv64", ""];

    #[test]
    fn test_supported_matrix() {
        assert_eq!(PlatformKey::resolve("linux", "amd64").unwrap(), PlatformKey::LinuxAmd64);
        assert_eq!(PlatformKey::resolve("linux", "arm64").unwrap(), PlatformKey::LinuxArm64);
        assert_eq!(PlatformKey::resolve("darwin", "amd64").unwrap(), PlatformKey::DarwinAmd64);
        assert_eq!(PlatformKey::resolve("darwin", "arm64").unwrap(), PlatformKey::DarwinArm64);
        assert_eq!(PlatformKey::resolve("windows", "amd64").unwrap(), PlatformKey::WindowsAmd64);
    }

    #[test]
    fn test_matrix_is_closed() {
        let mut supported = 0;
        for os in OSES {
            for arch in ARCHES {
                match PlatformKey::resolve(os, arch) {
                    Ok(key) => {
                        supported += 1;
                        assert_eq!(key.as_str(), format!("{}_{}", os, arch));
                    }
                    Err(RegistryError::UnsupportedPlatform { os: o, arch: a }) => {
                        assert_eq!((o.as_str(), a.as_str()), (os, arch));
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
        }
        assert_eq!(supported, 5);
    }

    #[test]
    fn test_windows_arm64_unsupported() {
        let err = PlatformKey::resolve("windows", "arm64").unwrap_err();
        assert_eq!(err.to_string(), "unsupported platform: windows_arm64");
    }

    #[test]
    fn test_no_rust_target_spellings() {
        assert!(PlatformKey::resolve("macos", "aarch64").is_err());
        assert!(PlatformKey::resolve("Linux", "amd64").is_err());
    }

    #[test]
    fn test_host_translation() {
        assert_eq!(os_identifier("macos"), "darwin");
        assert_eq!(os_identifier("linux"), "linux");
        assert_eq!(arch_identifier("x86_64"), "amd64");
        assert_eq!(arch_identifier("aarch64"), "arm64");
        assert_eq!(arch_identifier("powerpc64"), "powerpc64");
    }

    #[test]
    fn test_parse_round_trips_display() {
        for key in PlatformKey::ALL {
            assert_eq!(key.to_string().parse::<PlatformKey>().unwrap(), key);
        }
        assert!("windows_arm64".parse::<PlatformKey>().is_err());
    }
}
