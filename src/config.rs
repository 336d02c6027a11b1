//! Checker configuration
//!
//! `CheckerConfig` carries the caller's policy for one resolution pass:
//! which versions to ignore, whether ignoring everything is an error, the
//! release cooldown, an explicit requirements update strategy, and the
//! time budget for the native resolver.

use crate::domain::RequirementsUpdateStrategy;
use crate::error::ConfigError;
use crate::update::CooldownOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time budget for one native resolver invocation
pub const DEFAULT_RESOLVER_TIMEOUT: Duration = Duration::from_secs(300);

/// Parse duration string like "2w", "10d", "1m", "90s", "6h"
///
/// Units: s = seconds, h = hours, d = days, w = weeks, m = months (30 days)
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration {
        value: s.to_string(),
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let unit = trimmed.chars().last().ok_or_else(invalid)?;
    let num_str = &trimmed[..trimmed.len() - unit.len_utf8()];
    let num: u64 = num_str.parse().map_err(|_| invalid())?;

    let scale: u64 = match unit {
        's' => 1,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        'w' => 7 * 24 * 60 * 60,
        'm' => 30 * 24 * 60 * 60,
        _ => return Err(invalid()),
    };
    let seconds = num.checked_mul(scale).ok_or_else(invalid)?;

    Ok(Duration::from_secs(seconds))
}

/// Policy for one resolution pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Constraints naming versions that must never be proposed
    pub ignored_versions: Vec<String>,
    /// Fail with `AllVersionsIgnored` instead of returning no version
    pub raise_on_ignored: bool,
    /// Release cooldown applied to latest-version candidates
    pub cooldown: Option<CooldownOptions>,
    /// Overrides the library/application default
    pub requirements_update_strategy: Option<RequirementsUpdateStrategy>,
    /// Time budget for one native resolver invocation, as seconds or a
    /// duration string such as `"2m"`
    #[serde(with = "duration_secs")]
    pub resolver_timeout: Duration,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            ignored_versions: Vec::new(),
            raise_on_ignored: false,
            cooldown: None,
            requirements_update_strategy: None,
            resolver_timeout: DEFAULT_RESOLVER_TIMEOUT,
        }
    }
}

impl CheckerConfig {
    /// Create a new CheckerConfig with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set ignored version constraints
    pub fn with_ignored_versions(mut self, ignored: Vec<String>) -> Self {
        self.ignored_versions = ignored;
        self
    }

    /// Set whether ignoring every candidate is an error
    pub fn with_raise_on_ignored(mut self, raise: bool) -> Self {
        self.raise_on_ignored = raise;
        self
    }

    /// Set the release cooldown
    pub fn with_cooldown(mut self, cooldown: CooldownOptions) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Set an explicit requirements update strategy
    pub fn with_requirements_update_strategy(mut self, strategy: RequirementsUpdateStrategy) -> Self {
        self.requirements_update_strategy = Some(strategy);
        self
    }

    /// Set the resolver time budget
    pub fn with_resolver_timeout(mut self, timeout: Duration) -> Self {
        self.resolver_timeout = timeout;
        self
    }
}

mod duration_secs {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => super::parse_duration(&text).map_err(de::Error::custom),
        }
    }
}
