//! PostgreSQL implementation of the short link repository.

use async_trait::async_trait;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{NewShortLink, ShortLink, ShortLinkPatch};
use crate::domain::repositories::{LinkPage, ListQuery, ShortLinkRepository, SortOrder};
use crate::error::AppError;

const COLUMNS: &str =
    "id, origin, short_code, count, owner_id, created_at, updated_at, deleted_at";

/// PostgreSQL repository for the `short_links` table.
///
/// Queries are bound at runtime (`query_as` + `FromRow`), so building the
/// crate does not require a live database.
pub struct PgShortLinkRepository {
    pool: Arc<PgPool>,
}

impl PgShortLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShortLinkRepository for PgShortLinkRepository {
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError> {
        let sql = format!(
            "INSERT INTO short_links (id, origin, short_code, owner_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );

        let link = sqlx::query_as::<_, ShortLink>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_link.origin)
            .bind(&new_link.short_code)
            .bind(new_link.owner_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(link)
    }

    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<ShortLink>, AppError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM short_links \
             WHERE short_code = $1 AND deleted_at IS NULL"
        );

        let link = sqlx::query_as::<_, ShortLink>(&sql)
            .bind(short_code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(link)
    }

    async fn find_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<Option<ShortLink>, AppError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM short_links \
             WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL"
        );

        let link = sqlx::query_as::<_, ShortLink>(&sql)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(link)
    }

    async fn list_by_owner(&self, owner_id: Uuid, query: ListQuery) -> Result<LinkPage, AppError> {
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        let sql = format!(
            "SELECT {COLUMNS} FROM short_links \
             WHERE owner_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at {direction}, id {direction} \
             LIMIT $2 OFFSET $3"
        );

        let items = sqlx::query_as::<_, ShortLink>(&sql)
            .bind(owner_id)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(self.pool.as_ref())
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM short_links WHERE owner_id = $1 AND deleted_at IS NULL",
        )
        .bind(owner_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(LinkPage { items, total })
    }

    async fn update(&self, id: Uuid, patch: ShortLinkPatch) -> Result<ShortLink, AppError> {
        let sql = format!(
            "UPDATE short_links SET \
                origin = COALESCE($2, origin), \
                short_code = COALESCE($3, short_code), \
                updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );

        sqlx::query_as::<_, ShortLink>(&sql)
            .bind(id)
            .bind(patch.origin)
            .bind(patch.short_code)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::not_found("Short URL not found", json!({ "id": id })))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE short_links SET deleted_at = now(), updated_at = now() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn increment_count(&self, short_code: &str, delta: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE short_links SET count = count + $2 \
             WHERE short_code = $1 AND deleted_at IS NULL",
        )
        .bind(short_code)
        .bind(delta)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }
}
