//! Handlers for short link management endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::api::dto::pagination::PaginationParams;
use crate::api::dto::short_link::{
    ListUrlsResponse, PaginationMeta, RegisterUrlRequest, ShortLinkResponse, UpdateUrlRequest,
};
use crate::api::middleware::identity::{CallerId, OptionalCallerId};
use crate::domain::entities::ShortLink;
use crate::error::AppError;
use crate::state::AppState;

/// Registers a destination URL.
///
/// # Endpoint
///
/// `POST /urls`
///
/// Anonymous requests are accepted; with `X-User-Id` the link is owned by
/// that caller and shows up in their listings.
///
/// # Request Body
///
/// ```json
/// { "origin": "https://example.com/a/very/long/path" }
/// ```
///
/// # Errors
///
/// Returns 400 Bad Request if the URL is invalid.
/// Returns 409 Conflict if no short code could be allocated.
pub async fn register_handler(
    State(state): State<AppState>,
    OptionalCallerId(owner_id): OptionalCallerId,
    Json(payload): Json<RegisterUrlRequest>,
) -> Result<(StatusCode, Json<ShortLinkResponse>), AppError> {
    payload.validate()?;

    let link = state
        .link_service
        .register(&payload.origin, owner_id)
        .await?;

    info!(id = %link.id, owner = ?owner_id, "POST /urls registered");

    Ok((StatusCode::CREATED, Json(to_response(&state, link))))
}

/// Lists the caller's links.
///
/// # Endpoint
///
/// `GET /urls?page=1&itemsPerPage=10&order=DESC`
pub async fn list_handler(
    State(state): State<AppState>,
    CallerId(owner_id): CallerId,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ListUrlsResponse>, AppError> {
    let listing = state
        .link_service
        .list(owner_id, params.into_list_params())
        .await?;

    let meta = PaginationMeta::from(&listing);
    let items = listing
        .items
        .into_iter()
        .map(|link| to_response(&state, link))
        .collect();

    Ok(Json(ListUrlsResponse { meta, items }))
}

/// Returns one of the caller's links.
///
/// # Endpoint
///
/// `GET /urls/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if the caller has no live link with this id.
pub async fn get_handler(
    State(state): State<AppState>,
    CallerId(owner_id): CallerId,
    Path(id): Path<String>,
) -> Result<Json<ShortLinkResponse>, AppError> {
    let id = parse_id(&id)?;
    let link = state.link_service.get_by_id(id, owner_id).await?;

    Ok(Json(to_response(&state, link)))
}

/// Points a link at a new destination.
///
/// # Endpoint
///
/// `PUT /urls/{id}`
///
/// A changed origin gets a new short code; the old code stops resolving.
pub async fn update_handler(
    State(state): State<AppState>,
    CallerId(owner_id): CallerId,
    Path(id): Path<String>,
    Json(payload): Json<UpdateUrlRequest>,
) -> Result<Json<ShortLinkResponse>, AppError> {
    payload.validate()?;
    let id = parse_id(&id)?;

    let link = state
        .link_service
        .update(id, owner_id, payload.origin.as_deref())
        .await?;

    Ok(Json(to_response(&state, link)))
}

/// Soft-deletes one of the caller's links.
///
/// # Endpoint
///
/// `DELETE /urls/{id}` → `204 No Content`
pub async fn delete_handler(
    State(state): State<AppState>,
    CallerId(owner_id): CallerId,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    state.link_service.delete(id, owner_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw)
        .map_err(|_| AppError::bad_request("Invalid id, expected a UUID", json!({ "id": raw })))
}

fn to_response(state: &AppState, link: ShortLink) -> ShortLinkResponse {
    let url = state.link_service.short_url(&link.short_code);
    ShortLinkResponse::from_link(link, url)
}
