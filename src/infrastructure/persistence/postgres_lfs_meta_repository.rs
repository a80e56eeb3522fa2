use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{non_negative, to_i64};
use crate::application::ports::{LfsMetaRepository, RepositoryError};
use crate::domain::entities::LfsMetaObject;
use crate::domain::value_objects::{Oid, Pointer, RepoId};

pub struct PostgresLfsMetaRepository {
    pool: PgPool,
}

impl PostgresLfsMetaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LfsMetaRepository for PostgresLfsMetaRepository {
    async fn find_by_oid(
        &self,
        repo_id: RepoId,
        oid: &Oid,
    ) -> Result<Option<LfsMetaObject>, RepositoryError> {
        let row = sqlx::query_as::<_, LfsMetaRow>(
            r#"
            SELECT repo_id, oid, size, created_at
            FROM lfs_meta_objects
            WHERE repo_id = $1 AND oid = $2
            "#,
        )
        .bind(repo_id.value())
        .bind(oid.as_hex())
        .fetch_optional(&self.pool)
        .await?;

        row.map(LfsMetaRow::into_domain).transpose()
    }

    async fn create(&self, meta: &LfsMetaObject) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO lfs_meta_objects (repo_id, oid, size, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (repo_id, oid) DO NOTHING
            "#,
        )
        .bind(meta.repo_id.value())
        .bind(meta.pointer.oid.as_hex())
        .bind(to_i64(meta.pointer.size, "size")?)
        .bind(meta.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_by_oid(&self, repo_id: RepoId, oid: &Oid) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM lfs_meta_objects WHERE repo_id = $1 AND oid = $2")
            .bind(repo_id.value())
            .bind(oid.as_hex())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_by_repo(&self, repo_id: RepoId) -> Result<u64, RepositoryError> {
        let (count,) =
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM lfs_meta_objects WHERE repo_id = $1")
                .bind(repo_id.value())
                .fetch_one(&self.pool)
                .await?;

        non_negative(count, "count")
    }
}

#[derive(sqlx::FromRow)]
struct LfsMetaRow {
    repo_id: i64,
    oid: String,
    size: i64,
    created_at: DateTime<Utc>,
}

impl LfsMetaRow {
    fn into_domain(self) -> Result<LfsMetaObject, RepositoryError> {
        let oid = Oid::from_hex(self.oid.trim())
            .map_err(|e| RepositoryError::SerializationError(e.to_string()))?;
        Ok(LfsMetaObject {
            repo_id: RepoId::new(self.repo_id),
            pointer: Pointer::new(oid, non_negative(self.size, "size")?),
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_into_domain() {
        let row = LfsMetaRow {
            repo_id: 1,
            oid: "a".repeat(64),
            size: 42,
            created_at: Utc::now(),
        };

        let meta = row.into_domain().unwrap();

        assert_eq!(meta.pointer.size, 42);
        assert_eq!(meta.pointer.oid.as_hex(), "a".repeat(64));
    }

    #[test]
    fn test_malformed_oid_is_rejected() {
        let row = LfsMetaRow {
            repo_id: 1,
            oid: "not-hex".into(),
            size: 42,
            created_at: Utc::now(),
        };

        assert!(matches!(
            row.into_domain(),
            Err(RepositoryError::SerializationError(_))
        ));
    }
}
