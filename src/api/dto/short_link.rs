//! DTOs for the `/urls` endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::application::services::LinkListing;
use crate::domain::entities::ShortLink;

/// Request body for `POST /urls`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUrlRequest {
    /// Destination to shorten (absolute http/https URL).
    #[validate(length(min = 1, max = 2048))]
    #[validate(url(message = "Invalid URL format"))]
    pub origin: String,
}

/// Request body for `PUT /urls/{id}`.
///
/// Omitting `origin` leaves the link unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUrlRequest {
    #[validate(length(min = 1, max = 2048))]
    #[validate(url(message = "Invalid URL format"))]
    pub origin: Option<String>,
}

/// JSON representation of a short link.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLinkResponse {
    pub id: Uuid,
    pub origin: String,
    pub short_code: String,
    /// Public short URL, `<BASE_URL>/r/<shortCode>`.
    pub url: String,
    pub count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortLinkResponse {
    pub fn from_link(link: ShortLink, url: String) -> Self {
        Self {
            id: link.id,
            origin: link.origin,
            short_code: link.short_code,
            url,
            count: link.count,
            created_at: link.created_at,
            updated_at: link.updated_at,
            deleted_at: link.deleted_at,
        }
    }
}

/// Pagination block of a listing.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u32,
    pub quantity_results: usize,
    pub quantity_total_items: i64,
    pub quantity_total_pages: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

impl From<&LinkListing> for PaginationMeta {
    fn from(listing: &LinkListing) -> Self {
        Self {
            page: listing.page,
            quantity_results: listing.items.len(),
            quantity_total_items: listing.total_items,
            quantity_total_pages: listing.total_pages(),
            has_previous_page: listing.has_previous_page(),
            has_next_page: listing.has_next_page(),
        }
    }
}

/// Response for `GET /urls`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListUrlsResponse {
    pub meta: PaginationMeta,
    pub items: Vec<ShortLinkResponse>,
}
