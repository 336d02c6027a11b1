//! Dependency files handed to a resolution pass

use serde::{Deserialize, Serialize};

/// A manifest or lockfile with its content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFile {
    /// File name relative to the project root (`composer.json`)
    pub name: String,
    /// File content
    pub content: String,
}

impl DependencyFile {
    /// Creates a new dependency file
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Finds a file by name
pub fn find_file<'a>(files: &'a [DependencyFile], name: &str) -> Option<&'a DependencyFile> {
    files.iter().find(|f| f.name == name)
}
