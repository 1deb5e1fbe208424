//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: Database reachable. Status is `healthy`, or `degraded`
///   when the cache or the broker is down (redirects keep working)
/// - **503 Service Unavailable**: Database unreachable
///
/// # Components Checked
///
/// 1. **Database**: `SELECT 1`
/// 2. **Cache**: Redis PING (`disabled` when Redis is not configured)
/// 3. **Broker**: RabbitMQ channel (`disabled` when not configured)
/// 4. **Backlog**: Fallback queue length
///
/// # Response
///
/// ```json
/// {
///   "status": "degraded",
///   "version": "0.1.0",
///   "checks": {
///     "database": { "status": "ok", "message": "Connected" },
///     "cache":    { "status": "ok", "message": "Redis connected" },
///     "broker":   { "status": "error", "message": "RabbitMQ unreachable" },
///     "backlog":  { "status": "ok", "message": "42 queued events" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = check_database(&state).await;
    let cache = check_cache(&state).await;
    let broker = check_broker(&state).await;
    let backlog = check_backlog(&state).await;

    let database_down = database.is_error();
    let degraded = cache.is_error() || broker.is_error() || backlog.is_error();

    let status = if database_down {
        "unhealthy"
    } else if degraded {
        "degraded"
    } else {
        "healthy"
    };

    let response = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            database,
            cache,
            broker,
            backlog,
        },
    };

    if database_down {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    } else {
        Ok(Json(response))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match state.repository.ping().await {
        Ok(()) => CheckStatus::ok("Connected"),
        Err(e) => CheckStatus::error(format!("Database error: {}", e)),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    if !state.cache_enabled {
        return CheckStatus::disabled();
    }

    if state.cache.health_check().await {
        CheckStatus::ok("Redis connected")
    } else {
        CheckStatus::error("Redis connection failed")
    }
}

async fn check_broker(state: &AppState) -> CheckStatus {
    let Some(broker) = &state.broker else {
        return CheckStatus::disabled();
    };

    if broker.health_check().await {
        CheckStatus::ok("RabbitMQ connected")
    } else {
        CheckStatus::error("RabbitMQ unreachable")
    }
}

async fn check_backlog(state: &AppState) -> CheckStatus {
    if !state.cache_enabled {
        return CheckStatus::disabled();
    }

    match state.backlog.len().await {
        Ok(len) => CheckStatus::ok(format!("{} queued events", len)),
        Err(e) => CheckStatus::error(format!("Fallback queue error: {}", e)),
    }
}
