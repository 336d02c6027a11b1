//! Constraint resolution through an ecosystem's own solver
//!
//! The solver answers one question: given the manifest files and a target
//! version, which version of the dependency can actually be installed?
//! A solver that cannot satisfy the constraints reports `Unresolvable`,
//! which is an answer rather than an error.

mod native;

pub use native::{composer_helper_path, native_helpers_root, NativeHelperResolver, NATIVE_HELPERS_ENV};

use crate::domain::{Dependency, DependencyFile, UnlockScope, Version};
use crate::error::ResolverError;
use async_trait::async_trait;
use std::fmt;

/// Input for one resolution
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    /// Dependency being checked
    pub dependency: &'a Dependency,
    /// Manifest and lockfile contents
    pub files: &'a [DependencyFile],
    /// Highest version the solver may pick
    pub target: Option<&'a Version>,
    /// Requirements the solver may relax
    pub unlock: UnlockScope,
}

/// Why the solver could not pick a version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    /// Solver output describing the conflict
    pub message: String,
}

impl ResolutionFailure {
    /// Create a failure with the solver's message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The solver settled on this version
    Resolved(Version),
    /// No installable version within the request's limits
    Unresolvable(ResolutionFailure),
}

impl ResolveOutcome {
    /// The resolved version, if any
    pub fn version(self) -> Option<Version> {
        match self {
            ResolveOutcome::Resolved(version) => Some(version),
            ResolveOutcome::Unresolvable(_) => None,
        }
    }
}

/// Trait for ecosystem constraint solvers
#[async_trait]
pub trait ConstraintResolver: Send + Sync {
    /// Resolve the dependency against `request.target`
    ///
    /// Conflicts are `Ok(ResolveOutcome::Unresolvable)`; process, registry
    /// and protocol failures are errors.
    async fn resolve(&self, request: ResolveRequest<'_>) -> Result<ResolveOutcome, ResolverError>;
}
