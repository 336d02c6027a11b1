//! Registry clients for fetching package version information
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - Packagist p2 metadata adapter

mod client;
mod packagist;

pub use client::HttpClient;
pub use packagist::PackagistAdapter;

use crate::error::RegistryError;
use crate::update::VersionInfo;
use async_trait::async_trait;

/// Trait for registry clients
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Get the registry name
    fn registry_name(&self) -> &'static str;

    /// Fetch released versions for a package
    ///
    /// An unknown package is `RegistryError::PackageNotFound`.
    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError>;
}
