//! System endpoints: API banner and health check.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::MessageResponse;
use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    service: &'static str,
    status: &'static str,
    timestamp: String,
    version: String,
}

/// `GET /` — API banner.
#[utoipa::path(
    get,
    path = "/",
    tag = "System",
    summary = "API banner",
    responses(
        (status = 200, description = "Service name", body = MessageResponse),
    )
)]
pub async fn root_handler() -> impl IntoResponse {
    Json(MessageResponse::new("Event Management System API"))
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Liveness check. Does not check the backing stores.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            service: env!("CARGO_PKG_NAME"),
            status: "healthy",
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// System routes mounted at the root level (not under `/api`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
}
