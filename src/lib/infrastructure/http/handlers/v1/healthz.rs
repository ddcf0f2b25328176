//! Health check handler

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    domain::dispatch::DispatchService,
    infrastructure::http::{
        errors::{ApiError, ErrorResponse},
        state::AppState,
    },
};

const STORAGE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// The health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// HTTP status code
    #[schema(example = 200)]
    pub code: u16,

    /// Status name
    #[schema(example = "OK")]
    pub status: String,

    /// Human readable status
    #[schema(example = "Available!")]
    pub message: String,
}

/// Check that the service and its database are available
#[utoipa::path(
    get,
    operation_id = "healthz",
    tag = "System",
    path = "/v1/healthz",
    responses(
        (status = StatusCode::OK, description = "Service is available", body = HealthResponse),
        (status = StatusCode::SERVICE_UNAVAILABLE, description = "Database is unavailable", body = ErrorResponse),
    )
)]
pub async fn handler<D: DispatchService>(
    State(state): State<AppState<D>>,
) -> Result<Json<HealthResponse>, ApiError> {
    match timeout(STORAGE_CHECK_TIMEOUT, state.dispatch.check_storage()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!("database health check timed out");
            return Err(ApiError::new_503("Database health check timed out"));
        }
    }

    Ok(Json(HealthResponse {
        code: StatusCode::OK.as_u16(),
        status: "OK".to_string(),
        message: "Available!".to_string(),
    }))
}
