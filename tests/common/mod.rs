//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use depcheck::domain::{Dependency, DependencyFile, SecurityAdvisory, UnlockScope, Version};
use depcheck::error::{GitError, RegistryError, ResolverError};
use depcheck::git::{GitMetadataSource, GitTag};
use depcheck::registry::RegistryClient;
use depcheck::resolver::{ConstraintResolver, ResolutionFailure, ResolveOutcome, ResolveRequest};
use depcheck::update::{CheckerInputs, VersionInfo};
use depcheck::CheckerConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT_LOGGING: Once = Once::new();

/// Installs a test-writer subscriber when RUST_LOG is set
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Registry serving fixed listings
#[derive(Default)]
pub struct StaticRegistry {
    listings: HashMap<String, Vec<VersionInfo>>,
    offline: bool,
    pub calls: AtomicUsize,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose every request fails with a network error
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn with_versions(mut self, package: &str, versions: &[&str]) -> Self {
        self.listings.insert(
            package.to_string(),
            versions.iter().map(|v| VersionInfo::undated(*v)).collect(),
        );
        self
    }

    pub fn with_listing(mut self, package: &str, listing: Vec<VersionInfo>) -> Self {
        self.listings.insert(package.to_string(), listing);
        self
    }
}

#[async_trait]
impl RegistryClient for StaticRegistry {
    fn registry_name(&self) -> &'static str {
        "static"
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(RegistryError::network_error(package, "static", "connection reset by peer"));
        }
        self.listings
            .get(package)
            .cloned()
            .ok_or_else(|| RegistryError::package_not_found(package, "static"))
    }
}

/// Git remote with one branch head and a tag list
#[derive(Default)]
pub struct StaticGit {
    heads: HashMap<String, String>,
    tags: Vec<GitTag>,
    unreachable: bool,
    pub calls: AtomicUsize,
}

impl StaticGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remote that cannot be contacted
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with_head(mut self, branch: &str, commit: &str) -> Self {
        self.heads.insert(branch.to_string(), commit.to_string());
        self
    }

    pub fn with_tag(mut self, name: &str, commit: &str) -> Self {
        self.tags.push(GitTag {
            name: name.to_string(),
            commit: commit.to_string(),
        });
        self
    }
}

#[async_trait]
impl GitMetadataSource for StaticGit {
    async fn head_commit(&self, url: &str, branch: &str) -> Result<String, GitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(GitError::command_failed("ls-remote", url, "could not resolve host"));
        }
        self.heads
            .get(branch)
            .cloned()
            .ok_or_else(|| GitError::ref_not_found(url, branch))
    }

    async fn tags(&self, url: &str) -> Result<Vec<GitTag>, GitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(GitError::command_failed("ls-remote", url, "could not resolve host"));
        }
        Ok(self.tags.clone())
    }
}

/// Solver accepting targets up to a ceiling per unlock scope
///
/// With `Own` unlock a rejected target falls back to the ceiling, the way
/// Composer settles on the newest installable release.
pub struct CeilingResolver {
    own: Option<Version>,
    none: Option<Version>,
    pub calls: Mutex<Vec<(Option<String>, UnlockScope)>>,
}

impl CeilingResolver {
    pub fn new(own: Option<&str>, none: Option<&str>) -> Self {
        Self {
            own: own.map(|v| Version::parse(v).unwrap()),
            none: none.map(|v| Version::parse(v).unwrap()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ConstraintResolver for CeilingResolver {
    async fn resolve(&self, request: ResolveRequest<'_>) -> Result<ResolveOutcome, ResolverError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.target.map(ToString::to_string), request.unlock));

        let ceiling = match request.unlock {
            UnlockScope::Own => self.own.as_ref(),
            UnlockScope::None => self.none.as_ref(),
            UnlockScope::Full => {
                return Err(ResolverError::UnlockNotImplemented {
                    scope: request.unlock.to_string(),
                })
            }
        };
        let Some(ceiling) = ceiling else {
            return Ok(ResolveOutcome::Unresolvable(ResolutionFailure::new("no installable set")));
        };
        match request.target {
            Some(target) if target <= ceiling => Ok(ResolveOutcome::Resolved(target.clone())),
            _ if request.unlock == UnlockScope::Own => Ok(ResolveOutcome::Resolved(ceiling.clone())),
            _ => Ok(ResolveOutcome::Unresolvable(ResolutionFailure::new("target conflicts"))),
        }
    }
}

/// `composer.json` declaring a package of the given type
pub fn manifest(package_type: &str) -> DependencyFile {
    DependencyFile::new(
        "composer.json",
        format!(r#"{{"name": "acme/app", "type": "{}", "require": {{}}}}"#, package_type),
    )
}

/// Inputs with an application manifest, default config and no advisories
pub fn inputs(
    dependency: Dependency,
    registry: Arc<StaticRegistry>,
    git: Arc<StaticGit>,
    resolver: Arc<CeilingResolver>,
) -> CheckerInputs {
    CheckerInputs {
        dependency,
        files: vec![manifest("project")],
        advisories: Vec::<SecurityAdvisory>::new(),
        config: CheckerConfig::new(),
        registry,
        git,
        resolver,
    }
}
