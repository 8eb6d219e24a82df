//! Version-string parsing and ordering.
//!
//! Version strings such as `v3.0` or `v10.25` are ordered numerically by
//! their dot-separated components rather than lexically, so `v10.0` sorts
//! after `v2.0`.
//!
//! Parsing is lenient: a component that is not a non-negative integer counts
//! as `0` and never produces an error. Existing deployments and changelog
//! ordering rely on that behavior, so it is kept as policy.

use std::cmp::Ordering;
use std::fmt;

const MAX_VERSION_LEN: usize = 128;

/// Numeric key derived from a version string.
///
/// Keys compare element-wise with missing trailing components treated as
/// `0`, so `v1` and `v1.0` produce equal keys. Components are held as
/// digit strings without leading zeros, so integers of any length compare
/// by magnitude.
#[derive(Clone, Debug, Default)]
pub struct OrderKey(Vec<String>);

impl OrderKey {
    /// Parse a version string into its ordering key.
    #[must_use]
    pub fn parse(version: &str) -> Self {
        let body = strip_marker(version);
        Self(body.split('.').map(normalize_component).collect())
    }

    /// Normalized digit strings, one per dot-separated component.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.0
    }
}

fn strip_marker(version: &str) -> &str {
    let mut chars = version.chars();
    match chars.next() {
        Some(first) if !first.is_ascii_digit() => chars.as_str(),
        _ => version,
    }
}

/// `007` becomes `7`, `+3` becomes `3`; anything that is not a
/// non-negative integer becomes `0`.
fn normalize_component(part: &str) -> String {
    let digits = part.strip_prefix('+').unwrap_or(part);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return "0".to_string();
    }
    match digits.trim_start_matches('0') {
        "" => "0".to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn cmp_component(lhs: &str, rhs: &str) -> Ordering {
    lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for idx in 0..len {
            let lhs = self.0.get(idx).map_or("0", String::as_str);
            let rhs = other.0.get(idx).map_or("0", String::as_str);
            match cmp_component(lhs, rhs) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(","))
    }
}

/// Compare two version strings by their [`OrderKey`].
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    OrderKey::parse(a).cmp(&OrderKey::parse(b))
}

/// A version string that cannot be used as a storage key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version '{version}': {reason}")]
pub struct InvalidVersion {
    pub version: String,
    pub reason: &'static str,
}

/// Check that a version string is usable as a storage key.
///
/// The string becomes part of a file name, so only ASCII alphanumerics and
/// `.`, `_`, `-`, `+` are accepted.
pub fn validate_version(version: &str) -> Result<(), InvalidVersion> {
    let reject = |reason| {
        Err(InvalidVersion {
            version: version.to_string(),
            reason,
        })
    };
    if version.is_empty() {
        return reject("version must not be empty");
    }
    if version.len() > MAX_VERSION_LEN {
        return reject("version is longer than 128 bytes");
    }
    if version == "." || version == ".." {
        return reject("version must not be a relative path component");
    }
    let allowed = version
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b'+'));
    if !allowed {
        return reject("version may only contain ASCII letters, digits, '.', '_', '-' or '+'");
    }
    Ok(())
}
