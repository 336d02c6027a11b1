//! Core domain models for depcheck
//!
//! This module contains the fundamental types used throughout the crate:
//! - Versions with semver precedence
//! - Dependencies, their requirements and sources
//! - Security advisories
//! - Update strategies and unlock scopes
//! - Resolution results

mod advisory;
mod dependency;
mod files;
mod strategy;
mod update_result;
mod version;

pub use advisory::SecurityAdvisory;
pub use dependency::{Dependency, DependencyKind, GitSource, Requirement, Source};
pub use files::{find_file, DependencyFile};
pub use strategy::{RequirementsUpdateStrategy, UnlockScope};
pub use update_result::{LatestVersion, UpdatedDependency};
pub use version::{InvalidVersion, Version};
