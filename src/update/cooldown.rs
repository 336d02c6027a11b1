//! Release cooldown
//!
//! Versions released within the cooldown window are not offered as the
//! latest version. The window can differ per semver bump kind and can be
//! limited to some dependencies with `include`/`exclude` name patterns
//! (`*` matches any run of characters).

use super::Candidate;
use crate::domain::Version;
use chrono::{DateTime, Duration, Utc};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

/// Cooldown configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownOptions {
    /// Days to wait when no bump-specific value applies
    pub default_days: u32,
    /// Days to wait for a new major version
    pub semver_major_days: Option<u32>,
    /// Days to wait for a new minor version
    pub semver_minor_days: Option<u32>,
    /// Days to wait for a new patch version
    pub semver_patch_days: Option<u32>,
    /// If non-empty, only these dependencies are subject to the cooldown
    pub include: Vec<String>,
    /// Dependencies never subject to the cooldown
    pub exclude: Vec<String>,
}

impl CooldownOptions {
    /// Create options with a single window for every bump kind
    pub fn new(default_days: u32) -> Self {
        Self {
            default_days,
            ..Self::default()
        }
    }

    /// Set the window for major bumps
    pub fn with_major_days(mut self, days: u32) -> Self {
        self.semver_major_days = Some(days);
        self
    }

    /// Set the window for minor bumps
    pub fn with_minor_days(mut self, days: u32) -> Self {
        self.semver_minor_days = Some(days);
        self
    }

    /// Set the window for patch bumps
    pub fn with_patch_days(mut self, days: u32) -> Self {
        self.semver_patch_days = Some(days);
        self
    }

    /// Set the include patterns
    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    /// Set the exclude patterns
    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    /// Check if the cooldown applies to a dependency
    pub fn applies_to(&self, name: &str) -> bool {
        if self.exclude.iter().any(|p| wildcard_match(p, name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| wildcard_match(p, name))
    }

    /// Window in days for moving from `current` to `candidate`
    ///
    /// Without a current version the candidate counts as a major bump.
    pub fn days_for(&self, current: Option<&Version>, candidate: &Version) -> u32 {
        let specific = match current {
            None => self.semver_major_days,
            Some(current) if candidate.major() > current.major() => self.semver_major_days,
            Some(current) if candidate.minor() > current.minor() => self.semver_minor_days,
            Some(_) => self.semver_patch_days,
        };
        specific.unwrap_or(self.default_days)
    }

    /// True if `candidate` is too young to be offered
    ///
    /// Candidates without a release date are never held back.
    pub fn in_cooldown(
        &self,
        candidate: &Candidate,
        current: Option<&Version>,
        name: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.applies_to(name) {
            return false;
        }
        let Some(released_at) = candidate.released_at else {
            return false;
        };
        let days = self.days_for(current, &candidate.version);
        if days == 0 {
            return false;
        }
        released_at > now - Duration::days(i64::from(days))
    }
}

const NAME_MATCH: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Case-insensitive glob match of a dependency name
///
/// A pattern that is not a valid glob only matches itself.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(glob) => glob.matches_with(name, NAME_MATCH),
        Err(_) => pattern.eq_ignore_ascii_case(name),
    }
}
