//! Registry-backed version selection
//!
//! `LatestVersionFinder` answers two questions from the registry listing of
//! one dependency: the newest acceptable release, and the lowest release
//! that fixes every known advisory. The listing is fetched at most once.

use super::{Candidate, CooldownOptions};
use crate::config::CheckerConfig;
use crate::domain::{Dependency, SecurityAdvisory, Version};
use crate::error::{CheckError, ConfigError};
use crate::registry::RegistryClient;
use crate::requirement::Constraint;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Picks candidate versions for one dependency from its registry listing
pub struct LatestVersionFinder {
    dependency: Dependency,
    current: Option<Version>,
    registry: Arc<dyn RegistryClient>,
    advisories: Vec<SecurityAdvisory>,
    ignored: Vec<Constraint>,
    raise_on_ignored: bool,
    cooldown: Option<CooldownOptions>,
    now: DateTime<Utc>,
    listing: OnceCell<Vec<Candidate>>,
}

impl LatestVersionFinder {
    /// Creates a finder; advisories about other dependencies are dropped
    pub fn new(
        dependency: &Dependency,
        registry: Arc<dyn RegistryClient>,
        config: &CheckerConfig,
        advisories: &[SecurityAdvisory],
    ) -> Result<Self, ConfigError> {
        let ignored = config
            .ignored_versions
            .iter()
            .map(|c| Constraint::parse(c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dependency: dependency.clone(),
            current: dependency.current_version(),
            registry,
            advisories: advisories
                .iter()
                .filter(|a| a.applies_to(&dependency.name))
                .cloned()
                .collect(),
            ignored,
            raise_on_ignored: config.raise_on_ignored,
            cooldown: config.cooldown.clone(),
            now: Utc::now(),
            listing: OnceCell::new(),
        })
    }

    /// Use a fixed clock for cooldown checks
    pub fn with_time(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Newest release that is not ignored, not a stray prerelease and not in cooldown
    pub async fn latest_version(&self) -> Result<Option<Version>, CheckError> {
        let candidates = self.filter_prereleases(self.listing().await?.to_vec());
        let candidates = self.filter_ignored(candidates)?;
        let candidates = self.filter_cooldown(candidates);

        let latest = candidates.into_iter().map(|c| c.version).max();
        debug!(dependency = %self.dependency.name, latest = ?latest.as_ref().map(Version::as_str), "latest version");
        Ok(latest)
    }

    /// Lowest release above the current one that fixes every advisory
    pub async fn lowest_security_fix_version(&self) -> Result<Option<Version>, CheckError> {
        let candidates = self.filter_prereleases(self.listing().await?.to_vec());
        let candidates = self.filter_ignored(candidates)?;
        let candidates = self.filter_lower_versions(candidates);

        let fix = candidates
            .into_iter()
            .map(|c| c.version)
            .filter(|v| self.advisories.iter().all(|a| a.is_fixed_in(v)))
            .min();
        debug!(dependency = %self.dependency.name, fix = ?fix.as_ref().map(Version::as_str), "lowest security fix");
        Ok(fix)
    }

    /// Advisories that apply to this dependency
    pub fn advisories(&self) -> &[SecurityAdvisory] {
        &self.advisories
    }

    async fn listing(&self) -> Result<&Vec<Candidate>, CheckError> {
        self.listing
            .get_or_try_init(|| async {
                match self.registry.fetch_versions(&self.dependency.name).await {
                    Ok(listing) => Ok(Candidate::from_listing(&listing)),
                    Err(e) if e.is_not_found() => {
                        debug!(dependency = %self.dependency.name, "not listed in {}", self.registry.registry_name());
                        Ok(Vec::new())
                    }
                    Err(e) => Err(CheckError::from(e)),
                }
            })
            .await
    }

    fn filter_prereleases(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if self.current.as_ref().is_some_and(Version::is_prerelease) {
            return candidates;
        }
        candidates
            .into_iter()
            .filter(|c| !c.version.is_prerelease())
            .collect()
    }

    fn filter_ignored(&self, candidates: Vec<Candidate>) -> Result<Vec<Candidate>, CheckError> {
        let before = candidates.clone();
        let filtered: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !self.ignored.iter().any(|i| i.matches(&c.version)))
            .collect();

        if self.raise_on_ignored
            && self.filter_lower_versions(filtered.clone()).is_empty()
            && !self.filter_lower_versions(before).is_empty()
        {
            return Err(CheckError::all_versions_ignored(&self.dependency.name));
        }
        Ok(filtered)
    }

    fn filter_lower_versions(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        match &self.current {
            Some(current) => candidates
                .into_iter()
                .filter(|c| &c.version > current)
                .collect(),
            None => candidates,
        }
    }

    fn filter_cooldown(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let Some(cooldown) = &self.cooldown else {
            return candidates;
        };
        candidates
            .into_iter()
            .filter(|c| {
                !cooldown.in_cooldown(c, self.current.as_ref(), &self.dependency.name, self.now)
            })
            .collect()
    }
}
