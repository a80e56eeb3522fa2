use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::query_builder::QueryBuilder;
use super::{map_unique_violation, to_i64};
use crate::application::ports::{MirrorRepository, PushMirrorRepository, RepositoryError};
use crate::domain::entities::{MirrorConfig, PushMirrorConfig};
use crate::domain::value_objects::{PushMirrorId, RepoId};

pub struct PostgresMirrorRepository {
    pool: PgPool,
}

impl PostgresMirrorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MirrorRepository for PostgresMirrorRepository {
    async fn insert(&self, mirror: &MirrorConfig) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO mirrors (
                repo_id, interval_secs, next_update, enable_prune,
                remote_username, remote_password, lfs_enabled, lfs_endpoint,
                last_error, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(mirror.repo_id.value())
        .bind(interval_secs(mirror.interval)?)
        .bind(mirror.next_update)
        .bind(mirror.enable_prune)
        .bind(&mirror.remote_username)
        .bind(&mirror.remote_password)
        .bind(mirror.lfs_enabled)
        .bind(&mirror.lfs_endpoint)
        .bind(&mirror.last_error)
        .bind(mirror.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("mirror for repository {}", mirror.repo_id)))?;

        Ok(())
    }

    async fn find_by_repo_id(
        &self,
        repo_id: RepoId,
    ) -> Result<Option<MirrorConfig>, RepositoryError> {
        let sql = QueryBuilder::select_where(QueryBuilder::MIRROR_SELECT, "repo_id = $1");
        let row = sqlx::query_as::<_, MirrorRow>(&sql)
            .bind(repo_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(MirrorRow::into_domain).transpose()
    }

    async fn update(&self, mirror: &MirrorConfig) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE mirrors
            SET interval_secs = $2,
                next_update = $3,
                enable_prune = $4,
                remote_username = $5,
                remote_password = $6,
                lfs_enabled = $7,
                lfs_endpoint = $8,
                last_error = $9,
                updated_at = $10
            WHERE repo_id = $1
            "#,
        )
        .bind(mirror.repo_id.value())
        .bind(interval_secs(mirror.interval)?)
        .bind(mirror.next_update)
        .bind(mirror.enable_prune)
        .bind(&mirror.remote_username)
        .bind(&mirror.remote_password)
        .bind(mirror.lfs_enabled)
        .bind(&mirror.lfs_endpoint)
        .bind(&mirror.last_error)
        .bind(mirror.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "mirror for repository {}",
                mirror.repo_id
            )));
        }
        Ok(())
    }

    async fn delete_by_repo_id(&self, repo_id: RepoId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM mirrors WHERE repo_id = $1")
            .bind(repo_id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MirrorConfig>, RepositoryError> {
        let sql = format!(
            "{} ORDER BY next_update ASC LIMIT $2",
            QueryBuilder::select_where(
                QueryBuilder::MIRROR_SELECT,
                "interval_secs <> 0 AND next_update IS NOT NULL AND next_update <= $1",
            )
        );
        let rows = sqlx::query_as::<_, MirrorRow>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(MirrorRow::into_domain).collect()
    }
}

pub struct PostgresPushMirrorRepository {
    pool: PgPool,
}

impl PostgresPushMirrorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PushMirrorRepository for PostgresPushMirrorRepository {
    async fn insert(&self, mirror: &PushMirrorConfig) -> Result<PushMirrorId, RepositoryError> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO push_mirrors (
                repo_id, remote_name, remote_username, remote_password,
                interval_secs, created_at, last_update, last_error
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(mirror.repo_id.value())
        .bind(&mirror.remote_name)
        .bind(&mirror.remote_username)
        .bind(&mirror.remote_password)
        .bind(interval_secs(mirror.interval)?)
        .bind(mirror.created_at)
        .bind(mirror.last_update)
        .bind(&mirror.last_error)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("push mirror {}", mirror.remote_name)))?;

        Ok(PushMirrorId::new(id))
    }

    async fn find_by_id(
        &self,
        id: PushMirrorId,
    ) -> Result<Option<PushMirrorConfig>, RepositoryError> {
        let sql = QueryBuilder::select_where(QueryBuilder::PUSH_MIRROR_SELECT, "id = $1");
        let row = sqlx::query_as::<_, PushMirrorRow>(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(PushMirrorRow::into_domain).transpose()
    }

    async fn find_by_repo_id(
        &self,
        repo_id: RepoId,
    ) -> Result<Vec<PushMirrorConfig>, RepositoryError> {
        let sql = format!(
            "{} ORDER BY id ASC",
            QueryBuilder::select_where(QueryBuilder::PUSH_MIRROR_SELECT, "repo_id = $1")
        );
        let rows = sqlx::query_as::<_, PushMirrorRow>(&sql)
            .bind(repo_id.value())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(PushMirrorRow::into_domain).collect()
    }

    async fn update(&self, mirror: &PushMirrorConfig) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE push_mirrors
            SET remote_name = $2,
                remote_username = $3,
                remote_password = $4,
                interval_secs = $5,
                last_update = $6,
                last_error = $7
            WHERE id = $1
            "#,
        )
        .bind(mirror.id.value())
        .bind(&mirror.remote_name)
        .bind(&mirror.remote_username)
        .bind(&mirror.remote_password)
        .bind(interval_secs(mirror.interval)?)
        .bind(mirror.last_update)
        .bind(&mirror.last_error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("push mirror {}", mirror.id)));
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: PushMirrorId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM push_mirrors WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_by_repo_id(&self, repo_id: RepoId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM push_mirrors WHERE repo_id = $1")
            .bind(repo_id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_due(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PushMirrorConfig>, RepositoryError> {
        let sql = format!(
            "{} ORDER BY last_update ASC NULLS FIRST LIMIT $2",
            QueryBuilder::select_where(
                QueryBuilder::PUSH_MIRROR_SELECT,
                "interval_secs <> 0 \
                 AND COALESCE(last_update, to_timestamp(0)) + make_interval(secs => interval_secs) <= $1",
            )
        );
        let rows = sqlx::query_as::<_, PushMirrorRow>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(PushMirrorRow::into_domain).collect()
    }
}

fn interval_secs(interval: Duration) -> Result<i64, RepositoryError> {
    to_i64(interval.as_secs(), "interval_secs")
}

fn interval_from_secs(secs: i64) -> Result<Duration, RepositoryError> {
    super::non_negative(secs, "interval_secs").map(Duration::from_secs)
}

#[derive(sqlx::FromRow)]
struct MirrorRow {
    repo_id: i64,
    interval_secs: i64,
    next_update: Option<DateTime<Utc>>,
    enable_prune: bool,
    remote_username: String,
    remote_password: String,
    lfs_enabled: bool,
    lfs_endpoint: Option<String>,
    last_error: String,
    updated_at: Option<DateTime<Utc>>,
}

impl MirrorRow {
    fn into_domain(self) -> Result<MirrorConfig, RepositoryError> {
        Ok(MirrorConfig {
            repo_id: RepoId::new(self.repo_id),
            interval: interval_from_secs(self.interval_secs)?,
            next_update: self.next_update,
            enable_prune: self.enable_prune,
            remote_username: self.remote_username,
            remote_password: self.remote_password,
            lfs_enabled: self.lfs_enabled,
            lfs_endpoint: self.lfs_endpoint,
            last_error: self.last_error,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PushMirrorRow {
    id: i64,
    repo_id: i64,
    remote_name: String,
    remote_username: String,
    remote_password: String,
    interval_secs: i64,
    created_at: DateTime<Utc>,
    last_update: Option<DateTime<Utc>>,
    last_error: String,
}

impl PushMirrorRow {
    fn into_domain(self) -> Result<PushMirrorConfig, RepositoryError> {
        Ok(PushMirrorConfig {
            id: PushMirrorId::new(self.id),
            repo_id: RepoId::new(self.repo_id),
            remote_name: self.remote_name,
            remote_username: self.remote_username,
            remote_password: self.remote_password,
            interval: interval_from_secs(self.interval_secs)?,
            created_at: self.created_at,
            last_update: self.last_update,
            last_error: self.last_error,
        })
    }
}
