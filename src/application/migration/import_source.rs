use async_trait::async_trait;
use thiserror::Error;

use super::models::{
    Comment, CommentQuery, Issue, IssueContext, Label, Milestone, PullRequest, Release, RepoInfo,
    Review,
};
use super::options::MigrateOptions;
use crate::application::credentials::{self, FormattedCloneUrl, RemoteAddressError};

#[derive(Debug, Error)]
pub enum ImportSourceError {
    /// The source cannot provide this facet; callers skip it.
    #[error("{entity} is not supported by this source")]
    Unsupported { entity: &'static str },

    #[error("Invalid remote address: {0}")]
    InvalidUrl(#[from] RemoteAddressError),

    #[error("Source error: {0}")]
    Source(String),
}

impl ImportSourceError {
    pub fn unsupported(entity: &'static str) -> Self {
        Self::Unsupported { entity }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// A page of results plus whether it was the last one
pub type Page<T> = (Vec<T>, bool);

/// Structured import source (a forge API, an archive, ...).
///
/// Every data facet defaults to `Unsupported`, so a connector only overrides
/// what it can provide. Clone URL formatting defaults to the standard
/// credential rules.
#[async_trait]
pub trait ImportSource: Send + Sync {
    async fn repo_info(&self) -> Result<RepoInfo, ImportSourceError> {
        Err(ImportSourceError::unsupported("RepoInfo"))
    }

    async fn topics(&self) -> Result<Vec<String>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Topics"))
    }

    async fn milestones(&self) -> Result<Vec<Milestone>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Milestones"))
    }

    async fn releases(&self) -> Result<Vec<Release>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Releases"))
    }

    async fn labels(&self) -> Result<Vec<Label>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Labels"))
    }

    async fn issues(&self, _page: u32, _per_page: u32) -> Result<Page<Issue>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Issues"))
    }

    async fn comments(&self, _query: CommentQuery) -> Result<Page<Comment>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Comments"))
    }

    async fn pull_requests(
        &self,
        _page: u32,
        _per_page: u32,
    ) -> Result<Page<PullRequest>, ImportSourceError> {
        Err(ImportSourceError::unsupported("PullRequests"))
    }

    async fn reviews(&self, _context: IssueContext) -> Result<Vec<Review>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Reviews"))
    }

    fn format_clone_url(
        &self,
        opts: &MigrateOptions,
        remote: &str,
    ) -> Result<FormattedCloneUrl, ImportSourceError> {
        Ok(credentials::format_clone_url(&opts.auth(), remote)?)
    }

    /// Whether `comments` can list all comments of the repository at once
    fn supports_repo_comments(&self) -> bool {
        false
    }
}

/// Source for plain git remotes: only the repository payload is imported.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullImportSource;

#[async_trait]
impl ImportSource for NullImportSource {
    async fn repo_info(&self) -> Result<RepoInfo, ImportSourceError> {
        Err(ImportSourceError::unsupported("RepoInfo"))
    }

    async fn topics(&self) -> Result<Vec<String>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Topics"))
    }

    async fn milestones(&self) -> Result<Vec<Milestone>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Milestones"))
    }

    async fn releases(&self) -> Result<Vec<Release>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Releases"))
    }

    async fn labels(&self) -> Result<Vec<Label>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Labels"))
    }

    async fn issues(&self, _page: u32, _per_page: u32) -> Result<Page<Issue>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Issues"))
    }

    async fn comments(&self, _query: CommentQuery) -> Result<Page<Comment>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Comments"))
    }

    async fn pull_requests(
        &self,
        _page: u32,
        _per_page: u32,
    ) -> Result<Page<PullRequest>, ImportSourceError> {
        Err(ImportSourceError::unsupported("PullRequests"))
    }

    async fn reviews(&self, _context: IssueContext) -> Result<Vec<Review>, ImportSourceError> {
        Err(ImportSourceError::unsupported("Reviews"))
    }

    fn format_clone_url(
        &self,
        opts: &MigrateOptions,
        remote: &str,
    ) -> Result<FormattedCloneUrl, ImportSourceError> {
        Ok(credentials::format_clone_url(&opts.auth(), remote)?)
    }

    fn supports_repo_comments(&self) -> bool {
        false
    }
}
