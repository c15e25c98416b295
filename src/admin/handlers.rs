use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::security::rate_limit::LimiterSnapshot;

#[derive(Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct LimitsSummary {
    pub limiters: Vec<LimiterSnapshot>,
    pub orders_received: usize,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
    })
}

pub async fn get_limits(State(state): State<AppState>) -> Json<LimitsSummary> {
    Json(LimitsSummary {
        limiters: vec![state.auth_limiter.snapshot(), state.api_limiter.snapshot()],
        orders_received: state.orders.count(),
    })
}
