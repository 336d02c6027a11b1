//! depcheck - Update checker core for Composer dependencies
//!
//! Given one declared dependency, its manifest files and known advisories,
//! this library decides:
//! - the latest version, and the latest version the solver accepts
//! - the lowest version fixing every advisory
//! - how requirement strings should be rewritten
//! - whether and how far the dependency can be updated
//!
//! Registry, git and solver access sit behind traits so an orchestrator
//! can supply its own implementations.

pub mod config;
pub mod domain;
pub mod ecosystem;
pub mod error;
pub mod git;
pub mod registry;
pub mod requirement;
pub mod resolver;
pub mod update;

pub use config::CheckerConfig;
pub use ecosystem::{build_checker, Ecosystem, COMPOSER};
pub use error::{CheckError, ConfigError};
pub use update::{CheckerInputs, UpdateChecker};
