//! Update policies: how requirement strings move, how far the solver may unlock

use serde::{Deserialize, Serialize};
use std::fmt;

/// How requirement strings are rewritten for a new version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementsUpdateStrategy {
    /// Extend ranges to include the new version, never raising the floor
    WidenRanges,
    /// Always move requirements to the new version
    BumpVersions,
    /// Move requirements only when they don't admit the new version
    BumpVersionsIfNecessary,
    /// Leave requirements alone; only the lockfile changes
    LockfileOnly,
}

impl RequirementsUpdateStrategy {
    /// True when manifest requirements must not be touched
    pub fn is_lockfile_only(&self) -> bool {
        matches!(self, RequirementsUpdateStrategy::LockfileOnly)
    }
}

impl fmt::Display for RequirementsUpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequirementsUpdateStrategy::WidenRanges => "widen_ranges",
            RequirementsUpdateStrategy::BumpVersions => "bump_versions",
            RequirementsUpdateStrategy::BumpVersionsIfNecessary => "bump_versions_if_necessary",
            RequirementsUpdateStrategy::LockfileOnly => "lockfile_only",
        };
        f.write_str(name)
    }
}

/// How many requirements the solver may relax to reach a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockScope {
    /// Keep every requirement as declared
    None,
    /// Relax the checked dependency's own requirement
    Own,
    /// Relax any requirement in the graph
    ///
    /// Spelled `all`, as the resolver helper expects.
    #[serde(rename = "all")]
    Full,
}

impl fmt::Display for UnlockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnlockScope::None => "none",
            UnlockScope::Own => "own",
            UnlockScope::Full => "all",
        };
        f.write_str(name)
    }
}
