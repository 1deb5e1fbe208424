//! Short link entity, the single record the service persists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A persisted mapping from a short code to its destination URL.
///
/// `count` only ever changes through the store's atomic increment; the
/// application never writes a value it has read back.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ShortLink {
    pub id: Uuid,
    pub origin: String,
    pub short_code: String,
    pub count: i64,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortLink {
    /// Creates a live (not deleted) link with a zero counter.
    pub fn new(
        id: Uuid,
        origin: String,
        short_code: String,
        owner_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            origin,
            short_code,
            count: 0,
            owner_id,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    /// Returns true if the link has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns true if `owner_id` created this link.
    pub fn is_owned_by(&self, owner_id: Uuid) -> bool {
        self.owner_id == Some(owner_id)
    }
}

/// Input data for creating a new short link.
#[derive(Debug, Clone)]
pub struct NewShortLink {
    pub origin: String,
    pub short_code: String,
    pub owner_id: Option<Uuid>,
}

/// Partial update for an existing link. `None` fields are left unchanged.
///
/// `short_code` is only set together with `origin`, since the code is
/// derived from the destination.
#[derive(Debug, Clone, Default)]
pub struct ShortLinkPatch {
    pub origin: Option<String>,
    pub short_code: Option<String>,
}

impl ShortLinkPatch {
    pub fn is_empty(&self) -> bool {
        self.origin.is_none() && self.short_code.is_none()
    }
}
