//! Handler for short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_info::client_info_from_request;

/// Redirects a short code to its destination URL.
///
/// # Endpoint
///
/// `GET /r/{shortCode}`
///
/// # Request Flow
///
/// 1. Check the cache for `url:<shortCode>`
/// 2. On cache miss, read the store and populate the cache
/// 3. Hand an access event to the analytics cascade (not awaited)
/// 4. Return 302 Found
///
/// The response never depends on broker or fallback queue health.
///
/// # Errors
///
/// Returns 404 Not Found if no live link uses the short code.
pub async fn redirect_handler(
    Path(short_code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, AppError> {
    let client = client_info_from_request(&headers, addr, state.behind_proxy);

    let origin = state.resolver.resolve(&short_code, client).await?;

    Ok((StatusCode::FOUND, [(header::LOCATION, origin)]))
}
