mod postgres_lfs_meta_repository;
mod postgres_mirror_repository;
mod postgres_release_repository;
mod postgres_repo_repository;
mod query_builder;

pub use postgres_lfs_meta_repository::PostgresLfsMetaRepository;
pub use postgres_mirror_repository::{PostgresMirrorRepository, PostgresPushMirrorRepository};
pub use postgres_release_repository::PostgresReleaseRepository;
pub use postgres_repo_repository::{PostgresRepoRepository, PostgresUserRepository};
pub use query_builder::QueryBuilder;

use crate::application::ports::RepositoryError;

/// Postgres has no unsigned integers; values above `i64::MAX` are refused
fn to_i64(value: u64, column: &str) -> Result<i64, RepositoryError> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::SerializationError(format!("{column} out of range: {value}")))
}

fn non_negative(value: i64, column: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::SerializationError(format!("negative {column}: {value}")))
}

fn map_unique_violation(err: sqlx::Error, what: String) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::ConstraintViolation(format!("{what} already exists"))
        }
        _ => RepositoryError::Database(err),
    }
}
