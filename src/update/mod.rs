//! Update decisions for one dependency
//!
//! This module provides:
//! - Version info from registry with release date
//! - Release cooldown options
//! - `LatestVersionFinder`, which picks versions from the registry listing
//! - `UpdateChecker`, which combines the finder, git metadata and the
//!   native resolver into the answers an updater needs
//!
//! An `UpdateChecker` covers exactly one resolution pass. Every derived
//! quantity is computed at most once and reused by later questions.

mod cooldown;
mod finder;
mod version_info;

pub use cooldown::CooldownOptions;
pub use finder::LatestVersionFinder;
pub use version_info::{Candidate, VersionInfo};

use crate::config::CheckerConfig;
use crate::domain::{
    find_file, Dependency, DependencyFile, DependencyKind, LatestVersion, Requirement,
    RequirementsUpdateStrategy, SecurityAdvisory, UnlockScope, UpdatedDependency, Version,
};
use crate::ecosystem::Ecosystem;
use crate::error::{CheckError, ConfigError, ResolverError};
use crate::git::{GitMetadataSource, GitReferenceResolver};
use crate::registry::RegistryClient;
use crate::requirement::{Constraint, RequirementsUpdater};
use crate::resolver::{ConstraintResolver, ResolveOutcome, ResolveRequest};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::sync::OnceCell;
use tracing::debug;

static COMMIT_SHA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]{40}$").expect("valid regex"));

/// Everything one resolution pass reads
pub struct CheckerInputs {
    /// Dependency under check
    pub dependency: Dependency,
    /// Manifest and lockfile contents
    pub files: Vec<DependencyFile>,
    /// Known advisories; those for other dependencies are ignored
    pub advisories: Vec<SecurityAdvisory>,
    /// Caller policy
    pub config: CheckerConfig,
    /// Registry listing versions
    pub registry: Arc<dyn RegistryClient>,
    /// Git metadata for git dependencies
    pub git: Arc<dyn GitMetadataSource>,
    /// Ecosystem constraint solver
    pub resolver: Arc<dyn ConstraintResolver>,
}

/// Memoized answers for one pass
#[derive(Default)]
struct PassCache {
    latest_version: OnceCell<Option<LatestVersion>>,
    latest_version_from_registry: OnceCell<Option<Version>>,
    latest_resolvable_version: OnceCell<Option<Version>>,
    latest_resolvable_version_with_no_unlock: OnceCell<Option<Version>>,
    lowest_security_fix_version: OnceCell<Option<Version>>,
    lowest_resolvable_security_fix_version: OnceCell<Option<Version>>,
}

/// Decides which version a dependency should move to
pub struct UpdateChecker {
    ecosystem: &'static Ecosystem,
    dependency: Dependency,
    kind: DependencyKind,
    files: Vec<DependencyFile>,
    advisories: Vec<SecurityAdvisory>,
    config: CheckerConfig,
    finder: LatestVersionFinder,
    git: Option<GitReferenceResolver>,
    resolver: Arc<dyn ConstraintResolver>,
    cache: PassCache,
}

impl UpdateChecker {
    /// Creates a checker for one pass over `inputs.dependency`
    pub fn new(ecosystem: &'static Ecosystem, inputs: CheckerInputs) -> Result<Self, CheckError> {
        let CheckerInputs {
            dependency,
            files,
            advisories,
            config,
            registry,
            git,
            resolver,
        } = inputs;

        let kind = dependency.kind();
        debug!(dependency = %dependency, kind = ?kind, ecosystem = ecosystem.name, "classified dependency");

        let finder = LatestVersionFinder::new(&dependency, registry, &config, &advisories)?;
        let git = match &kind {
            DependencyKind::Git(source) => {
                let ignored = config
                    .ignored_versions
                    .iter()
                    .map(|c| Constraint::parse(c))
                    .collect::<Result<Vec<_>, _>>()?;
                Some(
                    GitReferenceResolver::new(&dependency, source.clone(), git)
                        .with_ignored(ignored, config.raise_on_ignored),
                )
            }
            _ => None,
        };
        let advisories = finder.advisories().to_vec();

        Ok(Self {
            ecosystem,
            dependency,
            kind,
            files,
            advisories,
            config,
            finder,
            git,
            resolver,
            cache: PassCache::default(),
        })
    }

    /// Use a fixed clock for cooldown checks
    pub fn with_time(mut self, now: DateTime<Utc>) -> Self {
        self.finder = self.finder.with_time(now);
        self
    }

    /// Dependency under check
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    /// Classification of the dependency
    pub fn kind(&self) -> &DependencyKind {
        &self.kind
    }

    /// Newest version the dependency could move to, ignoring resolvability
    ///
    /// Registry dependencies with no usable listing fall back to
    /// [`latest_resolvable_version`](Self::latest_resolvable_version).
    pub async fn latest_version(&self) -> Result<Option<LatestVersion>, CheckError> {
        self.cache
            .latest_version
            .get_or_try_init(|| async {
                match (&self.kind, &self.git) {
                    (DependencyKind::Path, _) => Ok(None),
                    (DependencyKind::Git(_), Some(git)) => git.latest_version().await,
                    (DependencyKind::Git(_), None) => Ok(None),
                    (DependencyKind::Registry, _) => {
                        if let Some(version) = self.latest_version_from_registry().await? {
                            return Ok(Some(LatestVersion::Release(version)));
                        }
                        debug!(dependency = %self.dependency.name, "no registry listing, asking the resolver");
                        Ok(self.latest_resolvable_version().await?.map(LatestVersion::Release))
                    }
                }
            })
            .await
            .cloned()
    }

    /// Newest version the solver accepts when the dependency's own requirement may move
    pub async fn latest_resolvable_version(&self) -> Result<Option<Version>, CheckError> {
        if !self.is_registry() {
            return Ok(None);
        }
        self.cache
            .latest_resolvable_version
            .get_or_try_init(|| async {
                let target = self.latest_version_from_registry().await?;
                self.resolve(target.as_ref(), UnlockScope::Own).await
            })
            .await
            .cloned()
    }

    /// Newest version the solver accepts with every requirement kept as declared
    pub async fn latest_resolvable_version_with_no_unlock(&self) -> Result<Option<Version>, CheckError> {
        if !self.is_registry() {
            return Ok(None);
        }
        self.cache
            .latest_resolvable_version_with_no_unlock
            .get_or_try_init(|| async {
                let target = self.latest_version_from_registry().await?;
                self.resolve(target.as_ref(), UnlockScope::None).await
            })
            .await
            .cloned()
    }

    /// Lowest listed release that fixes every advisory for the dependency
    pub async fn lowest_security_fix_version(&self) -> Result<Option<Version>, CheckError> {
        if matches!(self.kind, DependencyKind::Path) {
            return Ok(None);
        }
        self.cache
            .lowest_security_fix_version
            .get_or_try_init(|| self.finder.lowest_security_fix_version())
            .await
            .cloned()
    }

    /// The security fix if the solver accepts it as is, else the latest resolvable version
    ///
    /// Fails with `NotVulnerable` when no advisory affects the current version.
    pub async fn lowest_resolvable_security_fix_version(&self) -> Result<Option<Version>, CheckError> {
        if !self.vulnerable() {
            return Err(CheckError::not_vulnerable(&self.dependency.name));
        }
        if !self.is_registry() {
            return Ok(None);
        }
        self.cache
            .lowest_resolvable_security_fix_version
            .get_or_try_init(|| async {
                let Some(fix) = self.lowest_security_fix_version().await? else {
                    return self.latest_resolvable_version().await;
                };
                let resolved = self.resolve(Some(&fix), UnlockScope::Own).await?;
                if resolved.as_ref() == Some(&fix) {
                    return Ok(Some(fix));
                }
                debug!(dependency = %self.dependency.name, fix = %fix, "fix does not resolve, using latest resolvable");
                self.latest_resolvable_version().await
            })
            .await
            .cloned()
    }

    /// True if the manifest declares a library package
    pub fn library(&self) -> Result<bool, ConfigError> {
        let filename = self.ecosystem.manifest_filename;
        let manifest = find_file(&self.files, filename)
            .ok_or_else(|| ConfigError::manifest_not_found(filename))?;
        let parsed: serde_json::Value = serde_json::from_str(&manifest.content)
            .map_err(|e| ConfigError::invalid_manifest(filename, e.to_string()))?;
        Ok(parsed.get("type").and_then(|t| t.as_str()) == Some("library"))
    }

    /// Configured strategy, else widen ranges for libraries and bump for applications
    pub fn requirements_update_strategy(&self) -> Result<RequirementsUpdateStrategy, CheckError> {
        if let Some(strategy) = self.config.requirements_update_strategy {
            return Ok(strategy);
        }
        Ok(if self.library()? {
            RequirementsUpdateStrategy::WidenRanges
        } else {
            RequirementsUpdateStrategy::BumpVersionsIfNecessary
        })
    }

    /// False when only the lockfile may change
    pub fn requirements_unlocked_or_can_be(&self) -> Result<bool, CheckError> {
        Ok(!self.requirements_update_strategy()?.is_lockfile_only())
    }

    /// True if an advisory affects the current version
    ///
    /// Unlocked dependencies and commit SHAs are never reported vulnerable.
    pub fn vulnerable(&self) -> bool {
        if self.advisories.is_empty() || self.version_is_sha() {
            return false;
        }
        match self.dependency.current_version() {
            Some(current) => self.advisories.iter().any(|a| a.affects(&current)),
            None => false,
        }
    }

    /// The security fix when vulnerable, else the latest resolvable version
    pub async fn preferred_resolvable_version(&self) -> Result<Option<Version>, CheckError> {
        if self.vulnerable() {
            return self.lowest_resolvable_security_fix_version().await;
        }
        self.latest_resolvable_version().await
    }

    /// Requirements rewritten for the preferred resolvable version
    pub async fn updated_requirements(&self) -> Result<Vec<Requirement>, CheckError> {
        let target = self.preferred_resolvable_version().await?;
        let strategy = self.requirements_update_strategy()?;
        Ok(
            RequirementsUpdater::new(&self.dependency.requirements, target.as_ref(), strategy)
                .with_lockfile(self.locked())
                .updated_requirements(),
        )
    }

    /// Whether installed versions are recorded, by the lockfile or a known current version
    fn locked(&self) -> bool {
        self.dependency.version.is_some() || find_file(&self.files, self.ecosystem.lockfile_filename).is_some()
    }

    /// True if nothing newer is available
    pub async fn up_to_date(&self) -> Result<bool, CheckError> {
        let Some(current) = self.dependency.version.as_deref() else {
            return Ok(self.updated_requirements().await? == self.dependency.requirements);
        };
        let latest = self.latest_version().await?;

        if self.version_is_sha() {
            return Ok(latest.is_some_and(|l| l.as_str().starts_with(current)));
        }
        match (latest.as_ref().and_then(LatestVersion::as_release), self.dependency.current_version()) {
            (Some(latest), Some(current)) => Ok(latest <= &current),
            _ => Ok(false),
        }
    }

    /// True if an update is possible within `unlock`
    pub async fn can_update(&self, unlock: UnlockScope) -> Result<bool, CheckError> {
        if self.dependency.version.is_none() {
            return Ok(self.updated_requirements().await? != self.dependency.requirements);
        }
        if self.version_is_sha() {
            return self.sha_can_update(unlock).await;
        }
        if self.up_to_date().await? {
            return Ok(false);
        }
        if self.preferred_resolvable_version().await?.is_none() {
            return Ok(false);
        }

        let current = self.dependency.current_version();
        let newer = |v: &Version| current.as_ref().is_none_or(|c| v > c);
        match unlock {
            UnlockScope::None => Ok(self
                .latest_resolvable_version_with_no_unlock()
                .await?
                .is_some_and(|v| newer(&v))),
            UnlockScope::Own => Ok(self
                .preferred_resolvable_version()
                .await?
                .is_some_and(|v| newer(&v))),
            UnlockScope::Full => Ok(self.latest_version_resolvable_with_full_unlock()),
        }
    }

    /// The dependency after an update within `unlock`, or None if it cannot move
    pub async fn updated_dependency(&self, unlock: UnlockScope) -> Result<Option<UpdatedDependency>, CheckError> {
        if unlock == UnlockScope::Full {
            return self.updated_dependencies_after_full_unlock().map(|mut deps| deps.pop());
        }
        if !self.can_update(unlock).await? {
            return Ok(None);
        }

        let (version, requirements) = match unlock {
            _ if self.version_is_sha() => (
                self.latest_version().await?.map(|l| l.as_str().to_string()),
                self.dependency.requirements.clone(),
            ),
            UnlockScope::None => (
                self.latest_resolvable_version_with_no_unlock()
                    .await?
                    .map(|v| v.to_string()),
                self.dependency.requirements.clone(),
            ),
            _ => (
                self.preferred_resolvable_version().await?.map(|v| v.to_string()),
                self.updated_requirements().await?,
            ),
        };

        Ok(Some(UpdatedDependency {
            name: self.dependency.name.clone(),
            version,
            previous_version: self.dependency.version.clone(),
            requirements,
            previous_requirements: self.dependency.requirements.clone(),
        }))
    }

    /// Full unlock is not supported for this ecosystem
    pub fn latest_version_resolvable_with_full_unlock(&self) -> bool {
        false
    }

    /// Full unlock is not supported for this ecosystem
    pub fn updated_dependencies_after_full_unlock(&self) -> Result<Vec<UpdatedDependency>, CheckError> {
        Err(CheckError::NotImplemented {
            operation: "updated_dependencies_after_full_unlock",
        })
    }

    fn is_registry(&self) -> bool {
        matches!(self.kind, DependencyKind::Registry)
    }

    fn version_is_sha(&self) -> bool {
        self.dependency
            .version
            .as_deref()
            .is_some_and(|v| COMMIT_SHA.is_match(v))
    }

    async fn sha_can_update(&self, unlock: UnlockScope) -> Result<bool, CheckError> {
        if unlock == UnlockScope::Full {
            return Ok(self.latest_version_resolvable_with_full_unlock());
        }
        if self.up_to_date().await? {
            return Ok(false);
        }
        let current = self.dependency.version.as_deref().unwrap_or_default();
        Ok(self
            .latest_version()
            .await?
            .is_some_and(|l| !l.as_str().starts_with(current)))
    }

    async fn latest_version_from_registry(&self) -> Result<Option<Version>, CheckError> {
        self.cache
            .latest_version_from_registry
            .get_or_try_init(|| self.finder.latest_version())
            .await
            .cloned()
    }

    /// Runs the resolver under the configured time budget
    async fn resolve(&self, target: Option<&Version>, unlock: UnlockScope) -> Result<Option<Version>, CheckError> {
        if unlock == UnlockScope::Full {
            return Err(CheckError::NotImplemented {
                operation: "full unlock resolution",
            });
        }

        let request = ResolveRequest {
            dependency: &self.dependency,
            files: &self.files,
            target,
            unlock,
        };
        let timeout = self.config.resolver_timeout;
        let outcome = tokio::time::timeout(timeout, self.resolver.resolve(request))
            .await
            .map_err(|_| ResolverError::Timeout { timeout })??;

        match outcome {
            ResolveOutcome::Resolved(version) => {
                debug!(dependency = %self.dependency.name, %unlock, resolved = %version, "resolved");
                Ok(Some(version))
            }
            ResolveOutcome::Unresolvable(failure) => {
                debug!(dependency = %self.dependency.name, %unlock, %failure, "unresolvable");
                Ok(None)
            }
        }
    }
}
