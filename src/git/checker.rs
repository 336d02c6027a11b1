//! Update decisions for git dependencies
//!
//! A git dependency either tracks a branch, in which case the latest version
//! is the branch head, or is pinned to a ref. A pinned ref that looks like a
//! version moves to the newest tag with the same prefix; any other pin stays
//! where it is.

use super::{GitMetadataSource, VersionTag};
use crate::domain::{Dependency, GitSource, LatestVersion};
use crate::error::CheckError;
use crate::requirement::Constraint;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Resolves the latest revision of a git dependency
pub struct GitReferenceResolver {
    dependency: Dependency,
    source: GitSource,
    git: Arc<dyn GitMetadataSource>,
    ignored: Vec<Constraint>,
    raise_on_ignored: bool,
    head: OnceCell<String>,
    tags: OnceCell<Vec<VersionTag>>,
}

impl GitReferenceResolver {
    /// Creates a resolver for a dependency with the given git source
    pub fn new(dependency: &Dependency, source: GitSource, git: Arc<dyn GitMetadataSource>) -> Self {
        Self {
            dependency: dependency.clone(),
            source,
            git,
            ignored: Vec::new(),
            raise_on_ignored: false,
            head: OnceCell::new(),
            tags: OnceCell::new(),
        }
    }

    /// Set versions that must not be proposed
    pub fn with_ignored(mut self, ignored: Vec<Constraint>, raise_on_ignored: bool) -> Self {
        self.ignored = ignored;
        self.raise_on_ignored = raise_on_ignored;
        self
    }

    /// True if a ref other than the branch is pinned
    pub fn pinned(&self) -> bool {
        match (&self.source.reference, &self.source.branch) {
            (None, _) => false,
            (Some(reference), Some(branch)) => reference != branch,
            (Some(_), None) => true,
        }
    }

    /// The pinned ref as a version tag, if it is one
    fn pinned_tag(&self) -> Option<VersionTag> {
        if !self.pinned() {
            return None;
        }
        let reference = self.source.reference.as_deref()?;
        VersionTag::parse(reference, "")
    }

    /// True if pinned to a ref that parses as a version
    pub fn pinned_ref_looks_like_version(&self) -> bool {
        self.pinned_tag().is_some()
    }

    /// Head commit of the tracked branch; the current version when pinned
    pub async fn head_commit_for_current_branch(&self) -> Result<Option<String>, CheckError> {
        if self.pinned() {
            return Ok(self.dependency.version.clone());
        }
        let Some(branch) = self.source.branch.as_deref() else {
            return Ok(self.dependency.version.clone());
        };

        let head = self
            .head
            .get_or_try_init(|| async {
                debug!(url = %self.source.url, branch, "fetching branch head");
                self.git.head_commit(&self.source.url, branch).await
            })
            .await?;
        Ok(Some(head.clone()))
    }

    /// Newest version tag sharing the pinned tag's prefix and newer than it
    pub async fn local_tag_for_latest_version(&self) -> Result<Option<VersionTag>, CheckError> {
        let Some(pinned) = self.pinned_tag() else {
            return Ok(None);
        };

        let tags = self
            .tags
            .get_or_try_init(|| async {
                debug!(url = %self.source.url, "fetching version tags");
                self.git.tags_looking_like_versions(&self.source.url).await
            })
            .await?;

        let matching: Vec<&VersionTag> = tags
            .iter()
            .filter(|t| t.prefix.eq_ignore_ascii_case(&pinned.prefix))
            .collect();
        let allowed: Vec<&VersionTag> = matching
            .iter()
            .copied()
            .filter(|t| !self.ignored.iter().any(|i| i.matches(&t.version)))
            .collect();

        let newer = |t: &&VersionTag| t.version > pinned.version;
        if self.raise_on_ignored
            && !allowed.iter().any(newer)
            && matching.iter().any(newer)
        {
            return Err(CheckError::all_versions_ignored(&self.dependency.name));
        }

        let wants_prerelease = pinned.version.is_prerelease();
        Ok(allowed
            .into_iter()
            .filter(|t| wants_prerelease || !t.version.is_prerelease())
            .filter(|t| t.version > pinned.version)
            .max_by(|a, b| a.version.cmp(&b.version))
            .cloned())
    }

    /// Latest revision for the dependency
    ///
    /// - tracking a branch: the branch head
    /// - pinned to a version tag with a newer tag available: that tag's commit
    /// - anything else: the current version unchanged
    pub async fn latest_version(&self) -> Result<Option<LatestVersion>, CheckError> {
        if !self.pinned() {
            return Ok(self
                .head_commit_for_current_branch()
                .await?
                .map(LatestVersion::Revision));
        }

        if self.pinned_ref_looks_like_version() {
            if let Some(tag) = self.local_tag_for_latest_version().await? {
                debug!(dependency = %self.dependency.name, tag = %tag.name, "newer tag found");
                return Ok(Some(LatestVersion::Revision(tag.commit)));
            }
        }

        Ok(self.dependency.version.clone().map(LatestVersion::Revision))
    }
}
