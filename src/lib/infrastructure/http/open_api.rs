//! OpenAPI module

use utoipa::OpenApi;

use crate::infrastructure::http::{errors::ErrorResponse, handlers::v1::*};

#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "Mail Dispatcher"),
    paths(
        healthz::handler,
        messages::handler,
        dispatch::handler
    ),
    components(schemas(
        healthz::HealthResponse,
        messages::PendingMessageResponse,
        messages::ListMessagesResponse,
        dispatch::DispatchResponse,
        ErrorResponse,
    ))
)]
pub struct ApiDocs;
