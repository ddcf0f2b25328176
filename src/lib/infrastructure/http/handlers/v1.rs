use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{
    domain::dispatch::DispatchService,
    infrastructure::http::{open_api::ApiDocs, state::AppState},
};

pub mod dispatch;
pub mod healthz;
pub mod messages;
pub mod stoplight;

pub fn router<D: DispatchService>() -> Router<AppState<D>> {
    Router::new()
        .route("/", get(stoplight::handler))
        .route("/openapi.json", get(Json(ApiDocs::openapi())))
        .route("/healthz", get(healthz::handler))
        .route("/messages", get(messages::handler))
        .route("/dispatch", post(dispatch::handler))
}
