//! API error-handling module

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::dispatch::errors::{DispatchError, FetchMessagesError};

/// An error response
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// The error message
    #[schema(example = "Internal server error")]
    pub error: String,
}

/// An error raised in the API
#[derive(Debug, Deserialize, ToSchema)]
pub struct ApiError {
    /// The status code
    #[schema(example = 500, value_type = u16)]
    #[serde(with = "http_serde::status_code")]
    pub status: StatusCode,

    /// The error message
    #[schema(example = "Internal server error")]
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }

    /// Create a new not found error
    pub fn new_404(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Create new internal server error
    pub fn new_500(message: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Create a new bad gateway error
    pub fn new_502(message: &str) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    /// Create a new service unavailable error
    pub fn new_503(message: &str) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::new_500(&err.to_string())
    }
}

impl From<FetchMessagesError> for ApiError {
    fn from(err: FetchMessagesError) -> Self {
        error!(error = %err, "storage error");

        match err {
            FetchMessagesError::Unavailable(_) => ApiError::new_503("Database is unavailable"),
            _ => ApiError::new_500("Could not read pending messages"),
        }
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Fetch(err) => err.into(),
            DispatchError::Send(err) => ApiError::new_502(&format!("Could not send emails: {err}")),
            DispatchError::Commit {
                transaction_number,
                committed,
                ..
            } => ApiError::new_500(&format!(
                "Emails were sent but \"{transaction_number}\" could not be marked as sent ({committed} acknowledged)"
            )),
        }
    }
}
