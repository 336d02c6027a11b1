//! Resolution results

use super::{Requirement, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The newest version a dependency could move to
///
/// Git dependencies move between commits, so the answer is not always a
/// version number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LatestVersion {
    /// A released version
    Release(Version),
    /// A commit SHA, or an opaque ref kept as is
    Revision(String),
}

impl LatestVersion {
    /// The released version, if this is one
    pub fn as_release(&self) -> Option<&Version> {
        match self {
            LatestVersion::Release(version) => Some(version),
            LatestVersion::Revision(_) => None,
        }
    }

    /// The value as a string
    pub fn as_str(&self) -> &str {
        match self {
            LatestVersion::Release(version) => version.as_str(),
            LatestVersion::Revision(revision) => revision,
        }
    }
}

impl fmt::Display for LatestVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency after an update decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedDependency {
    /// Package name
    pub name: String,
    /// New locked version
    pub version: Option<String>,
    /// Locked version before the update
    pub previous_version: Option<String>,
    /// Requirements after the update
    pub requirements: Vec<Requirement>,
    /// Requirements before the update
    pub previous_requirements: Vec<Requirement>,
}

impl UpdatedDependency {
    /// True if any requirement string changed
    pub fn requirements_changed(&self) -> bool {
        self.requirements != self.previous_requirements
    }
}

impl fmt::Display for UpdatedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} → {}",
            self.name,
            self.previous_version.as_deref().unwrap_or("(unlocked)"),
            self.version.as_deref().unwrap_or("(unlocked)")
        )
    }
}
