//! Short link management: registration, lookup, listing, update and deletion.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::entities::{NewShortLink, ShortLink, ShortLinkPatch};
use crate::domain::repositories::{ListQuery, ShortLinkRepository, SortOrder};
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::ShortCodeGenerator;
use crate::utils::origin::validate_origin;

/// Default page number for listings.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size for listings.
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 10;
/// Largest accepted page size.
pub const MAX_ITEMS_PER_PAGE: u32 = 100;

/// Listing request after defaults have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub page: u32,
    pub items_per_page: u32,
    pub order: SortOrder,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            order: SortOrder::Desc,
        }
    }
}

impl ListParams {
    /// Validates the window and converts it to a repository query.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if `page` is 0 or `items_per_page` is
    /// outside `1..=100`.
    pub fn to_query(self) -> Result<ListQuery, AppError> {
        if self.page == 0 {
            return Err(AppError::bad_request(
                "Page must be greater than 0",
                json!({ "page": self.page }),
            ));
        }

        if !(1..=MAX_ITEMS_PER_PAGE).contains(&self.items_per_page) {
            return Err(AppError::bad_request(
                format!("Items per page must be between 1 and {MAX_ITEMS_PER_PAGE}"),
                json!({ "itemsPerPage": self.items_per_page }),
            ));
        }

        Ok(ListQuery {
            offset: i64::from(self.page - 1) * i64::from(self.items_per_page),
            limit: i64::from(self.items_per_page),
            order: self.order,
        })
    }
}

/// One page of an owner's links with the numbers needed to paginate.
#[derive(Debug, Clone)]
pub struct LinkListing {
    pub items: Vec<ShortLink>,
    pub page: u32,
    pub items_per_page: u32,
    pub total_items: i64,
}

impl LinkListing {
    pub fn total_pages(&self) -> i64 {
        let per_page = i64::from(self.items_per_page.max(1));
        (self.total_items + per_page - 1) / per_page
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn has_next_page(&self) -> bool {
        i64::from(self.page) < self.total_pages()
    }
}

/// Service for creating and managing short links.
///
/// Keeps the resolution cache in step with the store: codes are evicted
/// both before and after a mutation reaches the store, and the new mapping
/// is written after. The second eviction drops any entry a concurrent
/// redirect repopulated from the not-yet-mutated row. Cache failures are
/// logged and never block the store.
pub struct LinkService<R: ShortLinkRepository + ?Sized> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    generator: ShortCodeGenerator,
    base_url: String,
}

impl<R: ShortLinkRepository + ?Sized> LinkService<R> {
    /// Creates a new link service.
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        generator: ShortCodeGenerator,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            cache,
            generator,
            base_url: base_url.into(),
        }
    }

    /// Registers a destination URL and returns the persisted link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL is not an absolute
    /// http(s) URL of at most 2048 characters.
    ///
    /// Returns [`AppError::Conflict`] if no free code could be derived, or if
    /// another registration claimed the code first.
    pub async fn register(
        &self,
        origin: &str,
        owner_id: Option<Uuid>,
    ) -> Result<ShortLink, AppError> {
        let origin = validate_origin(origin).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        let short_code = self.allocate_code(&origin).await?;

        let link = self
            .repository
            .create(NewShortLink {
                origin,
                short_code,
                owner_id,
            })
            .await?;

        info!(short_code = %link.short_code, id = %link.id, "Short link registered");

        self.warm_cache(&link).await;

        Ok(link)
    }

    /// Returns the caller's live link with this id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link does not exist, was
    /// deleted, or belongs to someone else.
    pub async fn get_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<ShortLink, AppError> {
        self.repository
            .find_by_id(id, owner_id)
            .await?
            .ok_or_else(|| AppError::not_found("Short URL not found", json!({ "id": id })))
    }

    /// Lists the caller's live links, newest first unless `order` says otherwise.
    pub async fn list(&self, owner_id: Uuid, params: ListParams) -> Result<LinkListing, AppError> {
        let query = params.to_query()?;
        let page = self.repository.list_by_owner(owner_id, query).await?;

        Ok(LinkListing {
            items: page.items,
            page: params.page,
            items_per_page: params.items_per_page,
            total_items: page.total,
        })
    }

    /// Points a link at a new destination.
    ///
    /// A changed origin gets a freshly derived code. The old cache key is
    /// evicted around the store write and the new one populated after it.
    /// Passing `None` or the current origin leaves the link untouched.
    pub async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        origin: Option<&str>,
    ) -> Result<ShortLink, AppError> {
        let current = self.get_by_id(id, owner_id).await?;

        let Some(origin) = origin else {
            return Ok(current);
        };

        let origin = validate_origin(origin).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        if origin == current.origin {
            return Ok(current);
        }

        let short_code = self.allocate_code(&origin).await?;

        self.evict(&current.short_code).await;

        let updated = self
            .repository
            .update(
                id,
                ShortLinkPatch {
                    origin: Some(origin),
                    short_code: Some(short_code),
                },
            )
            .await?;

        self.evict(&current.short_code).await;

        info!(
            id = %id,
            old_code = %current.short_code,
            short_code = %updated.short_code,
            "Short link updated"
        );

        self.warm_cache(&updated).await;

        Ok(updated)
    }

    /// Soft-deletes the caller's link, evicting its cache entry before and
    /// after the store write.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the caller has no such link, and
    /// [`AppError::Internal`] if the store reports no row was deleted.
    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<(), AppError> {
        let current = self.get_by_id(id, owner_id).await?;

        self.evict(&current.short_code).await;

        let affected = self.repository.soft_delete(id).await?;
        if affected == 0 {
            return Err(AppError::internal(
                "Short URL could not be deleted",
                json!({ "id": id }),
            ));
        }

        self.evict(&current.short_code).await;

        info!(id = %id, short_code = %current.short_code, "Short link deleted");
        Ok(())
    }

    /// Public URL for a short code: `<base_url>/r/<code>`.
    pub fn short_url(&self, short_code: &str) -> String {
        format!("{}/r/{}", self.base_url.trim_end_matches('/'), short_code)
    }

    async fn allocate_code(&self, origin: &str) -> Result<String, AppError> {
        let repository = &self.repository;
        let code = self
            .generator
            .generate(origin, |candidate| async move {
                Ok(repository.find_by_short_code(&candidate).await?.is_some())
            })
            .await?;

        code.ok_or_else(|| {
            AppError::conflict(
                "Could not allocate a short code for this URL",
                json!({ "origin": origin }),
            )
        })
    }

    async fn warm_cache(&self, link: &ShortLink) {
        if let Err(e) = self.cache.set(&link.short_code, &link.origin, None).await {
            warn!(short_code = %link.short_code, error = %e, "Failed to populate cache");
        }
    }

    async fn evict(&self, short_code: &str) {
        if let Err(e) = self.cache.invalidate(short_code).await {
            warn!(short_code, error = %e, "Failed to evict cache entry");
        }
    }
}
