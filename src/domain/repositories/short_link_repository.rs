//! Repository trait for short link data access.

use crate::domain::entities::{NewShortLink, ShortLink, ShortLinkPatch};
use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

/// Sort direction for listings, applied to `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Offset/limit window for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: i64,
    pub limit: i64,
    pub order: SortOrder,
}

/// One page of links plus the total number of matching rows.
#[derive(Debug, Clone, Default)]
pub struct LinkPage {
    pub items: Vec<ShortLink>,
    pub total: i64,
}

/// Repository interface for the system of record.
///
/// Every lookup excludes soft-deleted records. Counter changes go through
/// [`ShortLinkRepository::increment_count`] only.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgShortLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortLinkRepository: Send + Sync {
    /// Creates a new short link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if a live link already uses the code.
    /// Returns [`AppError::Internal`] on database errors.
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError>;

    /// Finds a live link by its short code.
    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<ShortLink>, AppError>;

    /// Finds a live link by id, scoped to its owner.
    async fn find_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<Option<ShortLink>, AppError>;

    /// Lists live links created by `owner_id`.
    async fn list_by_owner(&self, owner_id: Uuid, query: ListQuery) -> Result<LinkPage, AppError>;

    /// Applies a partial update and bumps `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live link has this id.
    async fn update(&self, id: Uuid, patch: ShortLinkPatch) -> Result<ShortLink, AppError>;

    /// Soft-deletes a link by setting `deleted_at = now()`. Returns affected rows.
    async fn soft_delete(&self, id: Uuid) -> Result<u64, AppError>;

    /// Atomically adds `delta` to the counter of the live link with this code.
    ///
    /// Returns the number of affected rows; `0` means no live link matched.
    async fn increment_count(&self, short_code: &str, delta: i64) -> Result<u64, AppError>;

    /// Checks connectivity to the store.
    async fn ping(&self) -> Result<(), AppError>;
}
