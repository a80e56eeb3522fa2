use async_trait::async_trait;
use sqlx::PgPool;

use super::query_builder::QueryBuilder;
use super::{non_negative, to_i64};
use crate::application::ports::{RepoRepository, RepositoryError, UserRepository};
use crate::domain::entities::Repository;
use crate::domain::value_objects::{RepoId, UserId};

pub struct PostgresRepoRepository {
    pool: PgPool,
}

impl PostgresRepoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RepoRepository for PostgresRepoRepository {
    async fn find_by_id(&self, id: RepoId) -> Result<Option<Repository>, RepositoryError> {
        let sql = QueryBuilder::select_where(QueryBuilder::REPOSITORY_SELECT, "id = $1");
        let row = sqlx::query_as::<_, RepositoryRow>(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(RepositoryRow::into_domain).transpose()
    }

    async fn update(&self, repo: &Repository) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE repositories
            SET description = $2,
                default_branch = $3,
                topics = $4,
                is_empty = $5,
                is_mirror = $6,
                has_wiki = $7,
                size_bytes = $8
            WHERE id = $1
            "#,
        )
        .bind(repo.id.value())
        .bind(&repo.description)
        .bind(&repo.default_branch)
        .bind(&repo.topics)
        .bind(repo.is_empty)
        .bind(repo.is_mirror)
        .bind(repo.has_wiki)
        .bind(to_i64(repo.size_bytes, "size_bytes")?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("repository {}", repo.id)));
        }
        Ok(())
    }

    async fn update_size(&self, id: RepoId, size_bytes: u64) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE repositories SET size_bytes = $2 WHERE id = $1")
            .bind(id.value())
            .bind(to_i64(size_bytes, "size_bytes")?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("repository {id}")));
        }
        Ok(())
    }
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_id_by_email(&self, email: &str) -> Result<Option<UserId>, RepositoryError> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(id,)| UserId::new(id)))
    }
}

#[derive(sqlx::FromRow)]
struct RepositoryRow {
    id: i64,
    owner_id: i64,
    owner_name: String,
    name: String,
    description: String,
    default_branch: String,
    topics: Vec<String>,
    is_empty: bool,
    is_mirror: bool,
    has_wiki: bool,
    size_bytes: i64,
}

impl RepositoryRow {
    fn into_domain(self) -> Result<Repository, RepositoryError> {
        Ok(Repository {
            id: RepoId::new(self.id),
            owner_id: UserId::new(self.owner_id),
            owner_name: self.owner_name,
            name: self.name,
            description: self.description,
            default_branch: self.default_branch,
            topics: self.topics,
            is_empty: self.is_empty,
            is_mirror: self.is_mirror,
            has_wiki: self.has_wiki,
            size_bytes: non_negative(self.size_bytes, "size_bytes")?,
        })
    }
}
