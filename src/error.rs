//! Error types using thiserror
//!
//! Error hierarchy:
//! - ConfigError: Missing manifests, unknown ecosystems, bad constraints
//! - RegistryError: Issues with package registry communication
//! - GitError: Issues with git metadata retrieval
//! - ResolverError: Failures of the native constraint resolver process
//!
//! `CheckError` wraps all of them and adds the contract violations a caller
//! can trigger (`NotVulnerable`, `AllVersionsIgnored`, `NotImplemented`).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error type for one resolution pass
#[derive(Error, Debug)]
pub enum CheckError {
    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Package registry related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Git metadata related errors
    #[error(transparent)]
    Git(#[from] GitError),

    /// Native resolver related errors
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// A security-fix operation was called on a dependency with no matching advisory
    #[error("dependency '{dependency}' is not vulnerable")]
    NotVulnerable { dependency: String },

    /// Every candidate version was removed by the ignore rules
    #[error("all versions of '{dependency}' are ignored")]
    AllVersionsIgnored { dependency: String },

    /// The operation is not supported for this ecosystem
    #[error("{operation} is not implemented for this ecosystem")]
    NotImplemented { operation: &'static str },
}

/// Errors related to configuration and caller input
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Expected manifest file not among the dependency files
    #[error("manifest file not found: {filename}")]
    ManifestNotFound { filename: String },

    /// Manifest content could not be parsed
    #[error("failed to parse {filename}: {message}")]
    InvalidManifest { filename: String, message: String },

    /// Invalid duration format
    #[error("invalid duration format '{value}': expected format like '30s', '2w', '10d', '1m'")]
    InvalidDuration { value: String },

    /// No checker registered under this name
    #[error("unknown ecosystem '{name}'")]
    UnknownEcosystem { name: String },

    /// Requirement or range string that is not a version constraint
    #[error("invalid version constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },

    /// Version string that could not be parsed
    #[error("invalid version '{value}': {message}")]
    InvalidVersion { value: String, message: String },
}

/// Errors related to package registry communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// Authentication error
    #[error("authentication failed for {registry}: {message}")]
    AuthenticationError { registry: String, message: String },
}

/// Errors related to git metadata retrieval
#[derive(Error, Debug)]
pub enum GitError {
    /// The git binary could not be started
    #[error("failed to run git: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// git exited with a failure status
    #[error("git {command} failed for {url}: {stderr}")]
    CommandFailed {
        command: String,
        url: String,
        stderr: String,
    },

    /// The requested branch or tag does not exist upstream
    #[error("ref '{reference}' not found in {url}")]
    RefNotFound { url: String, reference: String },

    /// git produced output that could not be parsed
    #[error("unexpected git output for {url}: {message}")]
    InvalidOutput { url: String, message: String },
}

/// Errors related to the native resolver process
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Helper executable is missing
    #[error("native helper not found at {path}")]
    HelperNotFound { path: PathBuf },

    /// Helper process could not be started or talked to
    #[error("failed to run native helper {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Helper did not answer in time
    #[error("native helper timed out after {}s", .timeout.as_secs())]
    Timeout { timeout: Duration },

    /// Helper output was not a valid response
    #[error("invalid native helper response: {message}")]
    Protocol { message: String },

    /// Helper could not reach a package registry
    #[error("native helper registry failure: {message}")]
    Registry { message: String },

    /// Helper reported an unexpected failure
    #[error("native helper failed ({class}): {message}")]
    Helper { class: String, message: String },

    /// The requested unlock scope is not supported
    #[error("unlock scope '{scope}' is not implemented")]
    UnlockNotImplemented { scope: String },
}

impl CheckError {
    /// Creates a new NotVulnerable error
    pub fn not_vulnerable(dependency: impl Into<String>) -> Self {
        CheckError::NotVulnerable {
            dependency: dependency.into(),
        }
    }

    /// Creates a new AllVersionsIgnored error
    pub fn all_versions_ignored(dependency: impl Into<String>) -> Self {
        CheckError::AllVersionsIgnored {
            dependency: dependency.into(),
        }
    }

    /// True for errors that are fatal to the pass and must not be retried
    pub fn is_configuration(&self) -> bool {
        match self {
            CheckError::Config(_) | CheckError::NotImplemented { .. } => true,
            CheckError::Resolver(ResolverError::UnlockNotImplemented { .. })
            | CheckError::Resolver(ResolverError::HelperNotFound { .. }) => true,
            _ => false,
        }
    }
}

impl ConfigError {
    /// Creates a new ManifestNotFound error
    pub fn manifest_not_found(filename: impl Into<String>) -> Self {
        ConfigError::ManifestNotFound {
            filename: filename.into(),
        }
    }

    /// Creates a new InvalidManifest error
    pub fn invalid_manifest(filename: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidManifest {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidConstraint error
    pub fn invalid_constraint(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidConstraint {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidVersion error
    pub fn invalid_version(value: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidVersion {
            value: value.into(),
            message: message.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// True if the registry has no such package
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::PackageNotFound { .. })
    }
}

impl GitError {
    /// Creates a new CommandFailed error
    pub fn command_failed(
        command: impl Into<String>,
        url: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        GitError::CommandFailed {
            command: command.into(),
            url: url.into(),
            stderr: stderr.into(),
        }
    }

    /// Creates a new RefNotFound error
    pub fn ref_not_found(url: impl Into<String>, reference: impl Into<String>) -> Self {
        GitError::RefNotFound {
            url: url.into(),
            reference: reference.into(),
        }
    }
}

impl ResolverError {
    /// Creates a new Protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        ResolverError::Protocol {
            message: message.into(),
        }
    }

    /// Creates a new Spawn error
    pub fn spawn(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ResolverError::Spawn {
            path: path.into(),
            source,
        }
    }
}
