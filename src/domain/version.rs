//! Version values as they appear in registry listings and git tags
//!
//! Registry listings are not always strict semver: `v1.2`, `2.0` and
//! `1.0.0RC1` all show up in the wild. Parsing is lenient about the shape
//! (optional `v` prefix, one to three numeric components, pre-release with or
//! without a dash) but the ordering is plain semver precedence.

use semver::{BuildMetadata, Prerelease};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string is not a recognisable version
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version '{input}': {reason}")]
pub struct InvalidVersion {
    /// The rejected input
    pub input: String,
    /// Why it was rejected
    pub reason: String,
}

impl InvalidVersion {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// A comparable, totally ordered version
///
/// Equality and ordering ignore build metadata and the original spelling,
/// so `v1.2` and `1.2.0` are the same version. `Display` keeps the spelling
/// the registry used.
#[derive(Debug, Clone)]
pub struct Version {
    inner: semver::Version,
    raw: String,
}

impl Version {
    /// Parses a version leniently
    pub fn parse(input: &str) -> Result<Self, InvalidVersion> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(InvalidVersion::new(input, "empty version"));
        }

        let body = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
        let (body, build) = match body.split_once('+') {
            Some((body, build)) => (body, Some(build)),
            None => (body, None),
        };

        let core_len = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let (core, rest) = body.split_at(core_len);
        let core = core.trim_end_matches('.');

        let mut numbers = Vec::with_capacity(4);
        for part in core.split('.') {
            if part.is_empty() {
                return Err(InvalidVersion::new(input, "missing numeric component"));
            }
            let n: u64 = part
                .parse()
                .map_err(|_| InvalidVersion::new(input, "numeric component out of range"))?;
            numbers.push(n);
        }
        match numbers.len() {
            1..=3 => {}
            // Four-part versions are accepted only when the last part is zero
            4 if numbers[3] == 0 => {
                numbers.pop();
            }
            _ => return Err(InvalidVersion::new(input, "too many numeric components")),
        }
        // `1.0.0RC1` is a version, `4f3e2a` is a commit
        if !rest.is_empty() && !rest.starts_with(['-', '.']) && numbers.len() < 2 {
            return Err(InvalidVersion::new(input, "unexpected suffix"));
        }
        numbers.resize(3, 0);

        let pre = rest.strip_prefix(['-', '.']).unwrap_or(rest);
        let pre = if pre.is_empty() {
            Prerelease::EMPTY
        } else {
            Prerelease::new(pre).map_err(|e| InvalidVersion::new(input, e.to_string()))?
        };
        let build = match build {
            Some(b) => BuildMetadata::new(b).map_err(|e| InvalidVersion::new(input, e.to_string()))?,
            None => BuildMetadata::EMPTY,
        };

        Ok(Self {
            inner: semver::Version {
                major: numbers[0],
                minor: numbers[1],
                patch: numbers[2],
                pre,
                build,
            },
            raw: raw.to_string(),
        })
    }

    /// Builds a plain release version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        semver::Version::new(major, minor, patch).into()
    }

    /// Returns true if `input` parses as a version
    pub fn looks_like_version(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    /// Major component
    pub fn major(&self) -> u64 {
        self.inner.major
    }

    /// Minor component
    pub fn minor(&self) -> u64 {
        self.inner.minor
    }

    /// Patch component
    pub fn patch(&self) -> u64 {
        self.inner.patch
    }

    /// True for pre-release versions (`1.0.0-beta1`)
    pub fn is_prerelease(&self) -> bool {
        !self.inner.pre.is_empty()
    }

    /// Pre-release identifier, empty for releases
    pub fn prerelease(&self) -> &str {
        self.inner.pre.as_str()
    }

    /// The version as the registry spelled it
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The underlying semver value
    pub fn semver(&self) -> &semver::Version {
        &self.inner
    }
}

impl From<semver::Version> for Version {
    fn from(inner: semver::Version) -> Self {
        let raw = inner.to_string();
        Self { inner, raw }
    }
}

impl FromStr for Version {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = &self.inner;
        let b = &other.inner;
        a.major
            .cmp(&b.major)
            .then(a.minor.cmp(&b.minor))
            .then(a.patch.cmp(&b.patch))
            .then_with(|| a.pre.cmp(&b.pre))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.major.hash(state);
        self.inner.minor.hash(state);
        self.inner.patch.hash(state);
        self.inner.pre.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}
