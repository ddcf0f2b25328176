//! Dispatch trigger handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::dispatch::{CycleReport, DispatchService},
    infrastructure::http::{
        errors::{ApiError, ErrorResponse},
        state::AppState,
    },
};

/// The dispatch response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DispatchResponse {
    /// Messages fetched from the database
    #[schema(example = 3)]
    pub fetched: usize,

    /// Emails accepted by the relay
    #[schema(example = 3)]
    pub sent: usize,

    /// Messages marked as sent
    #[schema(example = 3)]
    pub committed: usize,
}

impl From<CycleReport> for DispatchResponse {
    fn from(report: CycleReport) -> Self {
        Self {
            fetched: report.fetched,
            sent: report.sent,
            committed: report.committed,
        }
    }
}

/// Run one dispatch cycle now.
///
/// Waits for a scheduled cycle that is already running to finish first.
#[utoipa::path(
    post,
    operation_id = "dispatch",
    tag = "Dispatch",
    path = "/v1/dispatch",
    responses(
        (status = StatusCode::OK, description = "Cycle completed", body = DispatchResponse),
        (status = StatusCode::BAD_GATEWAY, description = "The mail relay rejected the batch", body = ErrorResponse),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "The cycle failed", body = ErrorResponse),
    )
)]
pub async fn handler<D: DispatchService>(
    State(state): State<AppState<D>>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let report = state.dispatch.run_cycle().await?;

    Ok(Json(report.into()))
}
