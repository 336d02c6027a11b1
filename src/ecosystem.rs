//! Ecosystem definitions and the table of update checkers

use crate::error::{CheckError, ConfigError};
use crate::update::{CheckerInputs, UpdateChecker};
use std::fmt;

/// Files and helper layout of one package ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ecosystem {
    /// Identifier used to look the ecosystem up
    pub name: &'static str,
    /// Manifest declaring requirements
    pub manifest_filename: &'static str,
    /// Lockfile recording installed versions
    pub lockfile_filename: &'static str,
    /// Directory of the native helper under the helpers root
    pub helper_dir: &'static str,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// PHP packages managed by Composer
pub static COMPOSER: Ecosystem = Ecosystem {
    name: "composer",
    manifest_filename: "composer.json",
    lockfile_filename: "composer.lock",
    helper_dir: "composer",
};

/// Builds an update checker for one dependency
pub type CheckerFactory = fn(CheckerInputs) -> Result<UpdateChecker, CheckError>;

fn composer_checker(inputs: CheckerInputs) -> Result<UpdateChecker, CheckError> {
    UpdateChecker::new(&COMPOSER, inputs)
}

static REGISTERED_CHECKERS: &[(&str, CheckerFactory)] = &[("composer", composer_checker as CheckerFactory)];

/// Looks up the checker constructor for an ecosystem id
pub fn checker_factory(name: &str) -> Result<CheckerFactory, ConfigError> {
    REGISTERED_CHECKERS
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(name))
        .map(|(_, factory)| *factory)
        .ok_or_else(|| ConfigError::UnknownEcosystem {
            name: name.to_string(),
        })
}

/// Builds a checker for `name`, failing on unknown ecosystems
pub fn build_checker(name: &str, inputs: CheckerInputs) -> Result<UpdateChecker, CheckError> {
    let factory = checker_factory(name)?;
    tracing::debug!(ecosystem = name, dependency = %inputs.dependency.name, "building update checker");
    factory(inputs)
}

/// Ids of every registered ecosystem
pub fn registered_ecosystems() -> impl Iterator<Item = &'static str> {
    REGISTERED_CHECKERS.iter().map(|(id, _)| *id)
}
