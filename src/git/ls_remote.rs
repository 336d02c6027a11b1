//! `git ls-remote` backed metadata source

use super::{GitMetadataSource, GitTag};
use crate::error::GitError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::timeout;

/// Default time budget for one ls-remote call
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Branch heads and tags advertised by a remote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRefs {
    /// Branch name to commit
    pub heads: HashMap<String, String>,
    /// Tags with peeled commits
    pub tags: Vec<GitTag>,
}

/// Parses `git ls-remote` output
///
/// Annotated tags appear twice: the tag object and the peeled `^{}` entry
/// carrying the commit. The peeled commit wins.
pub fn parse_ls_remote(output: &str) -> RemoteRefs {
    let mut heads = HashMap::new();
    let mut direct: Vec<(String, String)> = Vec::new();
    let mut peeled: HashMap<String, String> = HashMap::new();

    for line in output.lines() {
        let Some((sha, reference)) = line.split_once('\t') else {
            continue;
        };
        let sha = sha.trim().to_string();
        if let Some(branch) = reference.strip_prefix("refs/heads/") {
            heads.insert(branch.to_string(), sha);
        } else if let Some(tag) = reference.strip_prefix("refs/tags/") {
            match tag.strip_suffix("^{}") {
                Some(name) => {
                    peeled.insert(name.to_string(), sha);
                }
                None => direct.push((tag.to_string(), sha)),
            }
        }
    }

    let tags = direct
        .into_iter()
        .map(|(name, sha)| {
            let commit = peeled.remove(&name).unwrap_or(sha);
            GitTag { name, commit }
        })
        .collect();

    RemoteRefs { heads, tags }
}

/// Reads remote refs with the git binary
///
/// Output is cached per URL, so a pass that asks for heads and tags runs
/// git once. Lookups of different URLs run concurrently.
pub struct LsRemote {
    git: String,
    timeout: Duration,
    cache: Mutex<HashMap<String, Arc<OnceCell<Arc<RemoteRefs>>>>>,
}

impl Default for LsRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl LsRemote {
    /// Use `git` from PATH
    pub fn new() -> Self {
        Self {
            git: "git".to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Use a specific git executable
    pub fn with_git(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    /// Set the time budget for one call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn refs(&self, url: &str) -> Result<Arc<RemoteRefs>, GitError> {
        // the map lock is only held to find the URL's cell
        let cell = self.cache.lock().await.entry(url.to_string()).or_default().clone();
        cell.get_or_try_init(|| async { Ok::<_, GitError>(Arc::new(parse_ls_remote(&self.run(url).await?))) })
            .await
            .cloned()
    }

    async fn run(&self, url: &str) -> Result<String, GitError> {
        tracing::debug!(target: "git", "Executing command: {} ls-remote --heads --tags {}", self.git, url);

        let mut cmd = Command::new(&self.git);
        cmd.args(["ls-remote", "--heads", "--tags", url])
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| GitError::Spawn { source })?,
            Err(_) => {
                tracing::warn!(target: "git", "ls-remote timed out after {} seconds: {}", self.timeout.as_secs(), url);
                return Err(GitError::command_failed(
                    "ls-remote",
                    url,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            }
        };

        if !output.status.success() {
            return Err(GitError::command_failed(
                "ls-remote",
                url,
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        String::from_utf8(output.stdout).map_err(|e| GitError::InvalidOutput {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl GitMetadataSource for LsRemote {
    async fn head_commit(&self, url: &str, branch: &str) -> Result<String, GitError> {
        let refs = self.refs(url).await?;
        refs.heads
            .get(branch)
            .cloned()
            .ok_or_else(|| GitError::ref_not_found(url, branch))
    }

    async fn tags(&self, url: &str) -> Result<Vec<GitTag>, GitError> {
        Ok(self.refs(url).await?.tags.clone())
    }
}
