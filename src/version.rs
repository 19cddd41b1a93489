//! CLI version normalization and ordering

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;
use semver::Version;

fn release_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("static regex"))
}

/// Normalize a version string: trim whitespace and strip one leading `v`.
///
/// `"v2.31.1"` and `"2.31.1"` both normalize to `"2.31.1"`. Every entry point
/// (validation, lookup, extension) goes through this function.
pub fn normalize_version(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_prefix('v').unwrap_or(trimmed).to_string()
}

/// Whether a normalized version is a plain `major.minor.patch` release
pub fn is_release_version(normalized: &str) -> bool {
    release_pattern().is_match(normalized)
}

/// Compare two normalized versions by semver precedence.
///
/// Strings that do not parse as semver sort after those that do.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sort version keys by semver precedence
pub fn sorted_versions<'a, I>(keys: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut versions: Vec<&str> = keys.into_iter().collect();
    versions.sort_by(|a, b| compare_versions(a, b));
    versions
}
