//! Packagist Registry adapter
//!
//! Fetches package version information from the Packagist registry.
//! API endpoint: https://repo.packagist.org/p2/{vendor}/{package}.json
//!
//! The p2 endpoint lists tagged releases only; branch versions live in the
//! separate `~dev` document and are not fetched.

use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryClient};
use crate::update::VersionInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Packagist metadata base URL
const PACKAGIST_API_URL: &str = "https://repo.packagist.org/p2";

/// Packagist Registry adapter
pub struct PackagistAdapter {
    client: HttpClient,
    base_url: String,
}

/// p2 metadata document
#[derive(Debug, Deserialize)]
struct PackagistResponse {
    /// `composer/2.0` when entries only list keys that changed
    #[serde(default)]
    minified: Option<String>,
    /// Version entries keyed by package name
    packages: HashMap<String, Vec<Map<String, Value>>>,
}

/// Marks a key removed relative to the previous minified entry
const UNSET: &str = "__unset";

/// Restores full entries from a `composer/2.0` minified list
///
/// Each entry inherits the keys of the one before it; `"__unset"` drops one.
fn expand_minified(entries: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    let mut previous: Option<Map<String, Value>> = None;
    entries
        .into_iter()
        .map(|entry| {
            let mut expanded = previous.take().unwrap_or_default();
            for (key, value) in entry {
                if value.as_str() == Some(UNSET) {
                    expanded.remove(&key);
                } else {
                    expanded.insert(key, value);
                }
            }
            previous = Some(expanded.clone());
            expanded
        })
        .collect()
}

impl PackagistAdapter {
    /// Create a new Packagist adapter
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: PACKAGIST_API_URL.to_string(),
        }
    }

    /// Use a Packagist-compatible mirror or private repository
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the URL for a package
    /// Package names are in the format vendor/package
    fn build_url(&self, package: &str) -> String {
        format!("{}/{}.json", self.base_url, package.to_ascii_lowercase())
    }
}

/// Extracts released versions for `package` from a p2 document
fn parse_versions(response: PackagistResponse, package: &str) -> Vec<VersionInfo> {
    let entries = response
        .packages
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(package))
        .map(|(_, entries)| entries)
        .unwrap_or_default();
    let entries = match response.minified.as_deref() {
        Some("composer/2.0") => expand_minified(entries),
        _ => entries,
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let version = entry.get("version")?.as_str()?.to_string();
            if version.starts_with("dev-") || version.ends_with("-dev") {
                return None;
            }
            let released_at = entry
                .get("time")
                .and_then(Value::as_str)
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc));
            Some(VersionInfo {
                version,
                released_at,
            })
        })
        .collect()
}

#[async_trait]
impl RegistryClient for PackagistAdapter {
    fn registry_name(&self) -> &'static str {
        "Packagist"
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        let url = self.build_url(package);
        let response: PackagistResponse = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;

        let versions = parse_versions(response, package);
        tracing::debug!(package, count = versions.len(), "fetched Packagist versions");
        Ok(versions)
    }
}
