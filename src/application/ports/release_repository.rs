use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};

use crate::domain::entities::ReleaseTagRecord;
use crate::domain::value_objects::{ReleaseId, RepoId};

use super::RepositoryError;

/// Paging and filtering for release listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseQuery {
    pub include_drafts: bool,
    pub include_tags: bool,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
}

impl ReleaseQuery {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }
}

/// Port for release/tag records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ReleaseRepository: Send + Sync {
    async fn list_by_repo(
        &self,
        repo_id: RepoId,
        query: ReleaseQuery,
    ) -> Result<Vec<ReleaseTagRecord>, RepositoryError>;

    /// Case-insensitive lookup by tag name
    async fn find_by_tag_name(
        &self,
        repo_id: RepoId,
        tag_name: &str,
    ) -> Result<Option<ReleaseTagRecord>, RepositoryError>;

    async fn insert(&self, release: &ReleaseTagRecord) -> Result<ReleaseId, RepositoryError>;

    async fn update(&self, release: &ReleaseTagRecord) -> Result<(), RepositoryError>;

    async fn delete_by_id(&self, id: ReleaseId) -> Result<(), RepositoryError>;
}
