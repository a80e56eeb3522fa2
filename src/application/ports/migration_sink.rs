use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};

use super::RepositoryError;
use crate::application::migration::models::{
    Comment, Issue, Label, Milestone, PullRequest, Release, Review,
};
use crate::domain::value_objects::RepoId;

/// Port through which imported facets reach the platform's own tables
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MigrationSink: Send + Sync {
    async fn create_topics(&self, repo_id: RepoId, topics: &[String])
        -> Result<(), RepositoryError>;

    async fn create_milestones(
        &self,
        repo_id: RepoId,
        milestones: &[Milestone],
    ) -> Result<(), RepositoryError>;

    async fn create_labels(&self, repo_id: RepoId, labels: &[Label]) -> Result<(), RepositoryError>;

    async fn create_releases(
        &self,
        repo_id: RepoId,
        releases: &[Release],
    ) -> Result<(), RepositoryError>;

    async fn create_issues(&self, repo_id: RepoId, issues: &[Issue]) -> Result<(), RepositoryError>;

    async fn create_comments(
        &self,
        repo_id: RepoId,
        comments: &[Comment],
    ) -> Result<(), RepositoryError>;

    async fn create_pull_requests(
        &self,
        repo_id: RepoId,
        pull_requests: &[PullRequest],
    ) -> Result<(), RepositoryError>;

    async fn create_reviews(&self, repo_id: RepoId, reviews: &[Review])
        -> Result<(), RepositoryError>;
}
