//! Native helper process
//!
//! The helper is an executable shipped next to the crate's host binary. It
//! reads one JSON request on stdin and writes one JSON response on stdout:
//!
//! ```text
//! -> {"function": "get_latest_resolvable_version", "args": {...}}
//! <- {"result": "1.3.0"}
//! <- {"error": "...", "error_class": "..."}
//! ```

use super::{ConstraintResolver, ResolutionFailure, ResolveOutcome, ResolveRequest};
use crate::config::DEFAULT_RESOLVER_TIMEOUT;
use crate::domain::{DependencyFile, Requirement, UnlockScope, Version};
use crate::ecosystem::COMPOSER;
use crate::error::ResolverError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable overriding the helpers root
pub const NATIVE_HELPERS_ENV: &str = "DEPCHECK_NATIVE_HELPERS_PATH";

/// Root directory holding the native helpers
///
/// Defaults to the parent of the directory holding the running executable.
pub fn native_helpers_root() -> PathBuf {
    if let Some(root) = std::env::var_os(NATIVE_HELPERS_ENV) {
        return PathBuf::from(root);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.parent().unwrap_or(dir).to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Path of the Composer helper for a Composer major version
pub fn composer_helper_path(root: &Path, composer_version: &str) -> PathBuf {
    root.join(COMPOSER.helper_dir)
        .join(format!("v{}", composer_version))
        .join("bin")
        .join("run")
}

#[derive(Debug, Serialize)]
struct HelperRequest<'a> {
    function: &'static str,
    args: HelperArgs<'a>,
}

#[derive(Debug, Serialize)]
struct HelperArgs<'a> {
    dependency_name: &'a str,
    dependency_version: Option<&'a str>,
    latest_allowable_version: Option<&'a str>,
    requirements: &'a [Requirement],
    requirements_to_unlock: String,
    files: &'a [DependencyFile],
}

#[derive(Debug, Deserialize)]
struct HelperResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_class: Option<String>,
}

/// Interprets the helper's stdout
fn parse_response(stdout: &str) -> Result<ResolveOutcome, ResolverError> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ResolverError::protocol("empty response"))?;
    let response: HelperResponse =
        serde_json::from_str(line).map_err(|e| ResolverError::protocol(e.to_string()))?;

    if let Some(message) = response.error {
        let class = response.error_class.unwrap_or_default();
        return match classify_error(class, message) {
            HelperFailure::Conflict(failure) => Ok(ResolveOutcome::Unresolvable(failure)),
            HelperFailure::Error(e) => Err(e),
        };
    }

    match response.result {
        Some(version) => Version::parse(&version)
            .map(ResolveOutcome::Resolved)
            .map_err(|e| ResolverError::protocol(e.to_string())),
        None => Ok(ResolveOutcome::Unresolvable(ResolutionFailure::new(
            "no installable version",
        ))),
    }
}

/// Either a negative answer or a real failure
enum HelperFailure {
    Conflict(ResolutionFailure),
    Error(ResolverError),
}

fn classify_error(class: String, message: String) -> HelperFailure {
    if class.ends_with("SolverProblemsException")
        || message.contains("requirements could not be resolved")
    {
        return HelperFailure::Conflict(ResolutionFailure::new(message));
    }
    if class.ends_with("TransportException") || message.contains("could not be downloaded") {
        return HelperFailure::Error(ResolverError::Registry { message });
    }
    HelperFailure::Error(ResolverError::Helper { class, message })
}

/// Resolver that runs the Composer native helper
pub struct NativeHelperResolver {
    helper_path: PathBuf,
    timeout: Duration,
}

impl NativeHelperResolver {
    /// Create a resolver for a specific helper executable
    pub fn new(helper_path: impl Into<PathBuf>) -> Self {
        Self {
            helper_path: helper_path.into(),
            timeout: DEFAULT_RESOLVER_TIMEOUT,
        }
    }

    /// Create a resolver for the Composer v2 helper under the helpers root
    pub fn from_env() -> Self {
        Self::new(composer_helper_path(&native_helpers_root(), "2"))
    }

    /// Set the time budget for one invocation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the helper executable
    pub fn helper_path(&self) -> &Path {
        &self.helper_path
    }

    async fn run(&self, input: Vec<u8>) -> Result<String, ResolverError> {
        let mut child = Command::new(&self.helper_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ResolverError::spawn(&self.helper_path, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&input).await {
                Ok(()) => {}
                // helper exited without reading its request
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(ResolverError::spawn(&self.helper_path, e)),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ResolverError::spawn(&self.helper_path, e))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(helper = %self.helper_path.display(), stderr = %stderr.trim(), "helper stderr");
        }
        String::from_utf8(output.stdout).map_err(|e| ResolverError::protocol(e.to_string()))
    }
}

#[async_trait]
impl ConstraintResolver for NativeHelperResolver {
    async fn resolve(&self, request: ResolveRequest<'_>) -> Result<ResolveOutcome, ResolverError> {
        if request.unlock == UnlockScope::Full {
            return Err(ResolverError::UnlockNotImplemented {
                scope: request.unlock.to_string(),
            });
        }
        if !self.helper_path.exists() {
            return Err(ResolverError::HelperNotFound {
                path: self.helper_path.clone(),
            });
        }

        let payload = HelperRequest {
            function: "get_latest_resolvable_version",
            args: HelperArgs {
                dependency_name: &request.dependency.name,
                dependency_version: request.dependency.version.as_deref(),
                latest_allowable_version: request.target.map(Version::as_str),
                requirements: &request.dependency.requirements,
                requirements_to_unlock: request.unlock.to_string(),
                files: request.files,
            },
        };
        let input = serde_json::to_vec(&payload).map_err(|e| ResolverError::protocol(e.to_string()))?;

        debug!(
            dependency = %request.dependency.name,
            target = ?request.target.map(Version::as_str),
            unlock = %request.unlock,
            "running native helper"
        );
        let stdout = match tokio::time::timeout(self.timeout, self.run(input)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(helper = %self.helper_path.display(), "native helper timed out");
                return Err(ResolverError::Timeout {
                    timeout: self.timeout,
                });
            }
        };

        parse_response(&stdout)
    }
}
