//! API route configuration.
//!
//! Caller identity is taken from the `X-User-Id` header by the
//! [`crate::api::middleware::identity`] extractors.

use crate::api::handlers::{
    delete_handler, get_handler, list_handler, register_handler, update_handler,
};
use crate::state::AppState;
use axum::{Router, routing::get};

/// Short link management routes.
///
/// # Endpoints
///
/// - `POST   /urls`        - Register a URL (identity optional)
/// - `GET    /urls`        - List the caller's links (paginated)
/// - `GET    /urls/{id}`   - Fetch one of the caller's links
/// - `PUT    /urls/{id}`   - Change the destination of a link
/// - `DELETE /urls/{id}`   - Soft-delete a link
pub fn url_routes() -> Router<AppState> {
    Router::new()
        .route("/urls", get(list_handler).post(register_handler))
        .route(
            "/urls/{id}",
            get(get_handler).put(update_handler).delete(delete_handler),
        )
}
