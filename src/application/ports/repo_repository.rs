use async_trait::async_trait;
#[cfg(test)]
use mockall::{automock, predicate::*};
use thiserror::Error;

use crate::domain::entities::Repository;
use crate::domain::value_objects::{RepoId, UserId};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Port for hosted repository rows
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RepoRepository: Send + Sync {
    async fn find_by_id(&self, id: RepoId) -> Result<Option<Repository>, RepositoryError>;

    /// Persist every mutable column of the repository
    async fn update(&self, repo: &Repository) -> Result<(), RepositoryError>;

    async fn update_size(&self, id: RepoId, size_bytes: u64) -> Result<(), RepositoryError>;
}

/// Port for resolving platform users
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find the user owning `email`, if any
    async fn find_id_by_email(&self, email: &str) -> Result<Option<UserId>, RepositoryError>;
}
