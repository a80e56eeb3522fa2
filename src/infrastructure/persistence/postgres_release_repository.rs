use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::query_builder::QueryBuilder;
use super::{map_unique_violation, non_negative, to_i64};
use crate::application::ports::{ReleaseQuery, ReleaseRepository, RepositoryError};
use crate::domain::entities::ReleaseTagRecord;
use crate::domain::value_objects::{ReleaseId, RepoId, UserId};

pub struct PostgresReleaseRepository {
    pool: PgPool,
}

impl PostgresReleaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReleaseRepository for PostgresReleaseRepository {
    async fn list_by_repo(
        &self,
        repo_id: RepoId,
        query: ReleaseQuery,
    ) -> Result<Vec<ReleaseTagRecord>, RepositoryError> {
        let sql = format!(
            "{} ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            QueryBuilder::select_where(
                QueryBuilder::RELEASE_SELECT,
                &QueryBuilder::release_filter(query.include_drafts, query.include_tags),
            )
        );
        let rows = sqlx::query_as::<_, ReleaseRow>(&sql)
            .bind(repo_id.value())
            .bind(i64::from(query.page_size))
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ReleaseRow::into_domain).collect()
    }

    async fn find_by_tag_name(
        &self,
        repo_id: RepoId,
        tag_name: &str,
    ) -> Result<Option<ReleaseTagRecord>, RepositoryError> {
        let sql = QueryBuilder::select_where(
            QueryBuilder::RELEASE_SELECT,
            "repo_id = $1 AND lower_tag_name = LOWER($2)",
        );
        let row = sqlx::query_as::<_, ReleaseRow>(&sql)
            .bind(repo_id.value())
            .bind(tag_name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ReleaseRow::into_domain).transpose()
    }

    async fn insert(&self, release: &ReleaseTagRecord) -> Result<ReleaseId, RepositoryError> {
        let (id,) = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO releases (
                repo_id, tag_name, lower_tag_name, sha1, num_commits,
                is_draft, is_tag, publisher_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(release.repo_id.value())
        .bind(&release.tag_name)
        .bind(&release.lower_tag_name)
        .bind(&release.sha1)
        .bind(to_i64(release.num_commits, "num_commits")?)
        .bind(release.is_draft)
        .bind(release.is_tag)
        .bind(release.publisher_id.map(|id| id.value()))
        .bind(release.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("release {}", release.tag_name)))?;

        Ok(ReleaseId::new(id))
    }

    async fn update(&self, release: &ReleaseTagRecord) -> Result<(), RepositoryError> {
        let id = release
            .id
            .ok_or_else(|| RepositoryError::Internal("release has no id".to_string()))?;
        let result = sqlx::query(
            r#"
            UPDATE releases
            SET tag_name = $2,
                lower_tag_name = $3,
                sha1 = $4,
                num_commits = $5,
                is_draft = $6,
                is_tag = $7,
                publisher_id = $8,
                created_at = $9
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .bind(&release.tag_name)
        .bind(&release.lower_tag_name)
        .bind(&release.sha1)
        .bind(to_i64(release.num_commits, "num_commits")?)
        .bind(release.is_draft)
        .bind(release.is_tag)
        .bind(release.publisher_id.map(|id| id.value()))
        .bind(release.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("release {id}")));
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: ReleaseId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM releases WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ReleaseRow {
    id: i64,
    repo_id: i64,
    tag_name: String,
    lower_tag_name: String,
    sha1: String,
    num_commits: i64,
    is_draft: bool,
    is_tag: bool,
    publisher_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl ReleaseRow {
    fn into_domain(self) -> Result<ReleaseTagRecord, RepositoryError> {
        Ok(ReleaseTagRecord {
            id: Some(ReleaseId::new(self.id)),
            repo_id: RepoId::new(self.repo_id),
            tag_name: self.tag_name,
            lower_tag_name: self.lower_tag_name,
            sha1: self.sha1,
            num_commits: non_negative(self.num_commits, "num_commits")?,
            is_draft: self.is_draft,
            is_tag: self.is_tag,
            publisher_id: self.publisher_id.map(UserId::new),
            created_at: self.created_at,
        })
    }
}
