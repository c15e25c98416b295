//! Request handlers for the public and login routes.
//!
//! Both protected routes follow the same shape: refuse blocked clients up
//! front, do the work, then tell the limiter how it went.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admin::auth::constant_time_eq;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::net::client_ip::ClientKey;
use crate::observability::metrics;
use crate::orders::{NewOrder, Order};
use crate::security::rate_limit::RateLimiter;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Refuse the request if `client` is currently blocked by `limiter`.
fn reject_if_blocked(limiter: &RateLimiter, client: &ClientKey) -> Result<(), ApiError> {
    if !limiter.is_blocked(client.as_str()) {
        return Ok(());
    }

    let retry_after_secs = limiter.get_blocked_time(client.as_str()).unwrap_or(1);
    tracing::warn!(
        limiter = %limiter.name(),
        client = %client,
        retry_after_secs,
        "Request refused, client blocked"
    );
    metrics::record_rejected(limiter.name());
    Err(ApiError::TooManyAttempts { retry_after_secs })
}

/// `POST /api/admin/login`
pub async fn login(
    State(state): State<AppState>,
    client: ClientKey,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let limiter = &state.auth_limiter;
    reject_if_blocked(limiter, &client)?;

    let configured = state.admin.password.as_bytes();
    if !configured.is_empty() && constant_time_eq(configured, body.password.as_bytes()) {
        limiter.reset(client.as_str());
        tracing::info!(client = %client, "Admin login succeeded");
        return Ok(Json(LoginResponse { authenticated: true }));
    }

    let outcome = limiter.record_failed_attempt(client.as_str());
    tracing::info!(client = %client, blocked = outcome.blocked, "Admin login failed");

    match outcome.remaining_time {
        Some(retry_after_secs) if outcome.blocked => {
            Err(ApiError::TooManyAttempts { retry_after_secs })
        }
        _ => Err(ApiError::InvalidCredentials),
    }
}

/// `POST /api/orders`
pub async fn create_order(
    State(state): State<AppState>,
    client: ClientKey,
    Json(order): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    reject_if_blocked(&state.api_limiter, &client)?;
    order.validate().map_err(ApiError::Validation)?;

    let stored = state.orders.insert(order);

    // Accepted submissions count as attempts, so a client gets a limited
    // number of orders per block window. Controlled by
    // `api.count_successful_submissions`.
    if state.count_successful_submissions {
        state.api_limiter.record_failed_attempt(client.as_str());
    }

    Ok((StatusCode::CREATED, Json(stored)))
}

/// `GET /api/orders/{id}`
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    state.orders.get(&id).map(Json).ok_or(ApiError::NotFound)
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
