use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};

use crate::domain::entities::LfsMetaObject;
use crate::domain::value_objects::{Oid, RepoId};

use super::RepositoryError;

/// Port for (repository, pointer) presence records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LfsMetaRepository: Send + Sync {
    async fn find_by_oid(
        &self,
        repo_id: RepoId,
        oid: &Oid,
    ) -> Result<Option<LfsMetaObject>, RepositoryError>;

    /// Create the record; returns `false` if it already existed
    async fn create(&self, meta: &LfsMetaObject) -> Result<bool, RepositoryError>;

    /// Remove the record; returns the number of rows removed
    async fn remove_by_oid(&self, repo_id: RepoId, oid: &Oid) -> Result<u64, RepositoryError>;

    async fn count_by_repo(&self, repo_id: RepoId) -> Result<u64, RepositoryError>;
}
