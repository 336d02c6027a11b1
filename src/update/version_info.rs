//! Version information from registry
//!
//! This module provides the VersionInfo struct that represents
//! a package version with its release date.

use crate::domain::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Information about a package version from the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// The version as listed (e.g., "1.2.3", "v2.0.0-beta1")
    pub version: String,
    /// When this version was released, if the registry says
    pub released_at: Option<DateTime<Utc>>,
}

impl VersionInfo {
    /// Create a new VersionInfo
    pub fn new(version: impl Into<String>, released_at: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            released_at: Some(released_at),
        }
    }

    /// Create a VersionInfo without a release date
    pub fn undated(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            released_at: None,
        }
    }

    /// Parsed version, or None if the listing entry is not a version
    pub fn parsed(&self) -> Option<Version> {
        Version::parse(&self.version).ok()
    }
}

/// A listing entry whose version parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Parsed version
    pub version: Version,
    /// Release date, if known
    pub released_at: Option<DateTime<Utc>>,
}

impl Candidate {
    /// Converts listing entries, dropping those that do not parse
    pub fn from_listing(listing: &[VersionInfo]) -> Vec<Candidate> {
        listing
            .iter()
            .filter_map(|info| {
                info.parsed().map(|version| Candidate {
                    version,
                    released_at: info.released_at,
                })
            })
            .collect()
    }
}
