use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::{automock, predicate::*};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    /// The named object (tag, remote, config section, ...) does not exist
    #[error("Not found: {0}")]
    NotExist(String),

    #[error("Command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Command `{0}` timed out")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected output: {0}")]
    Parse(String),
}

impl VcsError {
    pub fn is_not_exist(&self) -> bool {
        matches!(self, VcsError::NotExist(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    pub mirror: bool,
    pub bare: bool,
    pub quiet: bool,
    pub timeout: Duration,
    /// Extra leading arguments, e.g. credential helper configuration
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub remote: String,
    pub force: bool,
    pub mirror: bool,
    pub timeout: Duration,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub remote: String,
    pub prune: bool,
    pub timeout: Duration,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<Utc>,
}

/// A resolved tag: the commit it points at plus whatever identities could be
/// read from the tag object and the commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub name: String,
    pub commit_id: String,
    pub tagger: Option<Signature>,
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
}

impl TagInfo {
    /// Tag signature, else commit author, else commit committer
    pub fn signer(&self) -> Option<&Signature> {
        self.tagger
            .as_ref()
            .or(self.author.as_ref())
            .or(self.committer.as_ref())
    }
}

/// Port for the version-control subprocess wrapper
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VcsClient: Send + Sync {
    async fn clone_repo(
        &self,
        remote: &str,
        dest: &Path,
        opts: &CloneOptions,
    ) -> Result<(), VcsError>;

    /// Lightweight probe (`ls-remote`) that the remote answers
    async fn is_repo_url_accessible(&self, remote: &str, args: &[String]) -> bool;

    async fn update_server_info(&self, repo: &Path) -> Result<(), VcsError>;

    async fn is_empty(&self, repo: &Path) -> Result<bool, VcsError>;

    /// Branch HEAD points at, `None` when HEAD is detached or unborn
    async fn head_branch(&self, repo: &Path) -> Result<Option<String>, VcsError>;

    async fn list_tags(&self, repo: &Path) -> Result<Vec<String>, VcsError>;

    /// Commit the tag resolves to; `NotExist` when the tag is gone
    async fn tag_commit_id(&self, repo: &Path, tag: &str) -> Result<String, VcsError>;

    async fn tag_info(&self, repo: &Path, tag: &str) -> Result<TagInfo, VcsError>;

    /// Number of commits reachable from `commit_id`
    async fn commits_count(&self, repo: &Path, commit_id: &str) -> Result<u64, VcsError>;

    async fn remote_address(&self, repo: &Path, remote: &str) -> Result<String, VcsError>;

    /// `git remote add [--mirror=push] <name> <addr>`
    async fn add_remote(
        &self,
        repo: &Path,
        name: &str,
        address: &str,
        mirror_push: bool,
    ) -> Result<(), VcsError>;

    /// `git config --add <key> <value>`
    async fn add_config(&self, repo: &Path, key: &str, value: &str) -> Result<(), VcsError>;

    /// `NotExist` when no such remote is configured
    async fn remove_remote(&self, repo: &Path, name: &str) -> Result<(), VcsError>;

    /// `git config --file <config_file> --remove-section <section>`;
    /// `NotExist` when the file or section is absent
    async fn remove_config_section(&self, config_file: &Path, section: &str)
        -> Result<(), VcsError>;

    async fn push(&self, repo: &Path, opts: &PushOptions) -> Result<(), VcsError>;

    /// `git remote update [--prune] <remote>`
    async fn remote_update(&self, repo: &Path, opts: &FetchOptions) -> Result<(), VcsError>;

    async fn install_hooks(&self, repo: &Path) -> Result<(), VcsError>;

    /// Bytes used on disk by the object store
    async fn repository_size(&self, repo: &Path) -> Result<u64, VcsError>;
}
