//! Dependency information structures

use super::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Git source details for a requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
    /// Repository URL
    pub url: String,
    /// Branch the dependency tracks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Ref the dependency is pinned to (tag or commit)
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl GitSource {
    /// Creates a git source tracking `branch`
    pub fn branch(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            branch: Some(branch.into()),
            reference: None,
        }
    }

    /// Pins this source to `reference` (builder pattern)
    pub fn with_ref(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Where a requirement is satisfied from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Source {
    /// A package registry
    Registry {
        /// Registry URL, if not the default one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// A git repository
    Git(GitSource),
    /// A local path
    Path {
        /// Path relative to the manifest
        path: String,
    },
}

/// A declared constraint on a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Constraint string as written in the manifest (`^1.2.0`)
    pub requirement: Option<String>,
    /// Manifest file that declares it
    pub file: String,
    /// Dependency groups (`require`, `require-dev`)
    #[serde(default)]
    pub groups: Vec<String>,
    /// Source of the requirement
    #[serde(default)]
    pub source: Option<Source>,
}

impl Requirement {
    /// Creates a requirement without a source
    pub fn new(requirement: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            requirement: Some(requirement.into()),
            file: file.into(),
            groups: Vec::new(),
            source: None,
        }
    }

    /// Sets the source (builder pattern)
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the groups (builder pattern)
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// Returns a copy with a different constraint string
    pub fn with_requirement(&self, requirement: impl Into<String>) -> Self {
        Self {
            requirement: Some(requirement.into()),
            ..self.clone()
        }
    }
}

/// How a dependency is sourced, decided once per pass
///
/// Path sources take precedence over git sources. A git source only makes
/// a git dependency when it names a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKind {
    /// Installed from a local path, never updated
    Path,
    /// Tracks a git branch or ref
    Git(GitSource),
    /// Released through a registry
    Registry,
}

/// Represents a package dependency for one resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name
    pub name: String,
    /// Currently locked version, a version number or a commit SHA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Requirements declared across manifests
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    /// Package manager that owns the dependency
    pub package_manager: String,
}

impl Dependency {
    /// Creates a new dependency
    pub fn new(
        name: impl Into<String>,
        version: Option<&str>,
        requirements: Vec<Requirement>,
        package_manager: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.map(str::to_string),
            requirements,
            package_manager: package_manager.into(),
        }
    }

    /// Current version, when it parses as one
    pub fn current_version(&self) -> Option<Version> {
        self.version.as_deref().and_then(|v| Version::parse(v).ok())
    }

    /// Classifies the dependency by its requirement sources
    pub fn kind(&self) -> DependencyKind {
        let sources = || self.requirements.iter().filter_map(|r| r.source.as_ref());

        if sources().any(|s| matches!(s, Source::Path { .. })) {
            return DependencyKind::Path;
        }

        let git = sources().find_map(|s| match s {
            Source::Git(git) if git.branch.is_some() => Some(git.clone()),
            _ => None,
        });
        match git {
            Some(git) => DependencyKind::Git(git),
            None => DependencyKind::Registry,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{} [{}]", self.name, version, self.package_manager),
            None => write!(f, "{} [{}]", self.name, self.package_manager),
        }
    }
}
