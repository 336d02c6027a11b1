//! Git metadata for dependencies installed from a repository
//!
//! This module provides:
//! - `GitMetadataSource`, the seam to whatever reads remote refs
//! - `LsRemote`, a source backed by `git ls-remote`
//! - `GitReferenceResolver`, which decides what a git dependency moves to

mod checker;
mod ls_remote;

pub use checker::GitReferenceResolver;
pub use ls_remote::{parse_ls_remote, LsRemote, RemoteRefs};

use crate::domain::Version;
use crate::error::GitError;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

/// Splits a tag into a non-numeric prefix and the version-like rest
static TAG_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<prefix>[^0-9]*)(?P<version>[0-9].*)$").expect("valid regex"));

/// A tag and the commit it points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitTag {
    /// Tag name without `refs/tags/`
    pub name: String,
    /// Commit SHA (peeled for annotated tags)
    pub commit: String,
}

/// A tag whose name parses as a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    /// Tag name
    pub name: String,
    /// Commit SHA
    pub commit: String,
    /// Text before the version (`v`, `release-`, ...)
    pub prefix: String,
    /// Parsed version
    pub version: Version,
}

impl VersionTag {
    /// Parses a tag name; None if it does not look like a version
    pub fn parse(name: &str, commit: &str) -> Option<Self> {
        let caps = TAG_VERSION.captures(name)?;
        let prefix = caps.name("prefix").map_or("", |m| m.as_str());
        let version = Version::parse(caps.name("version")?.as_str()).ok()?;
        Some(Self {
            name: name.to_string(),
            commit: commit.to_string(),
            prefix: prefix.to_string(),
            version,
        })
    }
}

/// Trait for git metadata sources
#[async_trait]
pub trait GitMetadataSource: Send + Sync {
    /// Commit at the head of `branch`
    async fn head_commit(&self, url: &str, branch: &str) -> Result<String, GitError>;

    /// All tags of the repository
    async fn tags(&self, url: &str) -> Result<Vec<GitTag>, GitError>;

    /// Tags whose names parse as versions
    async fn tags_looking_like_versions(&self, url: &str) -> Result<Vec<VersionTag>, GitError> {
        Ok(self
            .tags(url)
            .await?
            .iter()
            .filter_map(|t| VersionTag::parse(&t.name, &t.commit))
            .collect())
    }
}
