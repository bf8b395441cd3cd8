//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the accounts API.

pub mod accounts;
pub mod review;

use axum::extract::State;
use axum::response::Json;

use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health handler that verifies database connectivity
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    crate::db::health_check(&state.db)
        .await
        .map_err(|err| ApiError::from(crate::error::DomainError::StoreUnavailable(err.to_string())))?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
