//! CLI Checksum Registry
//!
//! Trusted SHA256 digests for a downloaded third-party CLI, keyed by version
//! and platform. Callers resolve the expected digest before the binary is
//! ever executed.
//!
//! ## Features
//!
//! - **Exhaustive Validation**: every schema and content violation is reported at once
//! - **Self-Healing Store**: an embedded, validated registry seeds a missing default file
//! - **Closed Platform Matrix**: linux/darwin on amd64/arm64, windows on amd64
//! - **Version Normalization**: `2.31.1` and `v2.31.1` resolve identically
//!
//! ## Layout
//!
//! ```text
//! $XDG_CONFIG_HOME/ (or ~/.config, or %APPDATA% on Windows)
//! └── 1password-secrets/          (0700)
//!     └── action/                 (0700)
//!         └── 1password-cli-versions.yaml   (0600)
//! ```
//!
//! `OP_SECRETS_ACTION_VERSIONS_FILE` replaces the default path entirely.

pub mod checksum;
pub mod config;
pub mod error;
pub mod loader;
pub mod platform;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod store;
pub mod version;

pub use checksum::{verify_file, Checksum};
pub use config::Settings;
pub use error::{RegistryError, Result, ValidationError, Violation};
pub use loader::load;
pub use platform::PlatformKey;
pub use resolve::{
    expected_digest, expected_digest_for_current_platform, verify_binary,
    verify_binary_for_current_platform,
};
pub use schema::{PlatformChecksums, Registry, SCHEMA_VERSION};
pub use store::{embedded_default, BootstrapOutcome, RegistryLocation, RegistryStore};
pub use version::normalize_version;
