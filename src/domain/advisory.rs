//! Security advisories

use super::Version;
use crate::error::ConfigError;
use crate::requirement::Constraint;

/// A security advisory against one dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityAdvisory {
    /// Name of the affected dependency
    pub dependency_name: String,
    /// Ranges of affected versions
    pub vulnerable_ranges: Vec<Constraint>,
    /// Versions that carry the fix; each is a lower bound
    pub fixed_versions: Vec<Version>,
}

impl SecurityAdvisory {
    /// Creates an advisory from constraint and version strings
    pub fn new<'a>(
        dependency_name: impl Into<String>,
        vulnerable_ranges: impl IntoIterator<Item = &'a str>,
        fixed_versions: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigError> {
        let vulnerable_ranges = vulnerable_ranges
            .into_iter()
            .map(Constraint::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let fixed_versions = fixed_versions
            .into_iter()
            .map(|v| Version::parse(v).map_err(|e| ConfigError::invalid_version(v, e.reason)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dependency_name: dependency_name.into(),
            vulnerable_ranges,
            fixed_versions,
        })
    }

    /// True if the advisory is about `name` (Composer names are case-insensitive)
    pub fn applies_to(&self, name: &str) -> bool {
        self.dependency_name.eq_ignore_ascii_case(name)
    }

    /// Lowest fixed version, if any fix is known
    pub fn fixed_lower_bound(&self) -> Option<&Version> {
        self.fixed_versions.iter().min()
    }

    /// True if `version` is affected
    ///
    /// Without declared ranges everything below the lowest fix is affected.
    pub fn affects(&self, version: &Version) -> bool {
        if !self.vulnerable_ranges.is_empty() {
            return self.vulnerable_ranges.iter().any(|r| r.matches(version));
        }
        match self.fixed_lower_bound() {
            Some(fixed) => version < fixed,
            None => false,
        }
    }

    /// True if `version` is outside every range and at or above the fix
    pub fn is_fixed_in(&self, version: &Version) -> bool {
        if self.affects(version) {
            return false;
        }
        match self.fixed_lower_bound() {
            Some(fixed) => version >= fixed,
            None => true,
        }
    }
}
