//! Caller identity forwarded by the upstream authenticator.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the authenticated caller's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller. Rejects the request with `401` when absent.
///
/// # Header Format
///
/// ```text
/// X-User-Id: 3f2c8a1e-6d8b-4c55-9a0e-4f7e2b1d9c30
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

/// Caller identity for endpoints that also accept anonymous requests.
///
/// A malformed header is still rejected with `401`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionalCallerId(pub Option<Uuid>);

fn parse(parts: &Parts) -> Result<Option<Uuid>, AppError> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .map(Some)
        .ok_or_else(|| {
            AppError::unauthorized(
                "Unauthorized",
                json!({ "reason": "X-User-Id header is not a valid UUID" }),
            )
        })
}

impl<S: Send + Sync> FromRequestParts<S> for CallerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse(parts)?.map(CallerId).ok_or_else(|| {
            AppError::unauthorized(
                "Unauthorized",
                json!({ "reason": "X-User-Id header is missing" }),
            )
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for OptionalCallerId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse(parts).map(OptionalCallerId)
    }
}
