use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::{automock, predicate::*};

use crate::domain::entities::{MirrorConfig, PushMirrorConfig};
use crate::domain::value_objects::{PushMirrorId, RepoId};

use super::RepositoryError;

/// Port for pull-mirror configuration rows
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MirrorRepository: Send + Sync {
    async fn insert(&self, mirror: &MirrorConfig) -> Result<(), RepositoryError>;

    async fn find_by_repo_id(&self, repo_id: RepoId)
        -> Result<Option<MirrorConfig>, RepositoryError>;

    async fn update(&self, mirror: &MirrorConfig) -> Result<(), RepositoryError>;

    async fn delete_by_repo_id(&self, repo_id: RepoId) -> Result<(), RepositoryError>;

    /// Mirrors with a non-zero interval whose next update is due, oldest first
    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MirrorConfig>, RepositoryError>;
}

/// Port for push-mirror configuration rows
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PushMirrorRepository: Send + Sync {
    /// Insert and return the assigned id
    async fn insert(&self, mirror: &PushMirrorConfig) -> Result<PushMirrorId, RepositoryError>;

    async fn find_by_id(
        &self,
        id: PushMirrorId,
    ) -> Result<Option<PushMirrorConfig>, RepositoryError>;

    async fn find_by_repo_id(
        &self,
        repo_id: RepoId,
    ) -> Result<Vec<PushMirrorConfig>, RepositoryError>;

    /// Persist every mutable column of the mirror
    async fn update(&self, mirror: &PushMirrorConfig) -> Result<(), RepositoryError>;

    async fn delete_by_id(&self, id: PushMirrorId) -> Result<(), RepositoryError>;

    async fn delete_by_repo_id(&self, repo_id: RepoId) -> Result<(), RepositoryError>;

    /// Mirrors where `interval != 0` and `last_update + interval <= now`,
    /// ordered by `last_update` ascending
    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PushMirrorConfig>, RepositoryError>;
}
