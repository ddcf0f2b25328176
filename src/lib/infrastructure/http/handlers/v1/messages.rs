//! Pending messages handler

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::dispatch::{DispatchService, PendingMessage},
    infrastructure::http::{
        errors::{ApiError, ErrorResponse},
        state::AppState,
    },
};

/// A message waiting to be dispatched
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PendingMessageResponse {
    /// Storage identifier
    #[schema(example = 42)]
    pub id: i64,

    /// Business key used to acknowledge delivery
    #[schema(example = "TXN-0001")]
    pub transaction_number: String,

    /// Classification tag
    pub rule_id: String,

    /// Date the message belongs to
    #[schema(example = "2024-09-01")]
    pub occurred_at: String,

    /// Email subject
    pub subject: String,

    /// HTML body fragment
    pub body_html: String,

    /// Record type, `ADD` or `SEND`
    #[schema(example = "ADD")]
    pub status: String,

    /// Free-text comment
    pub comment: String,

    /// Recipients
    pub to_addresses: Vec<String>,

    /// Recipients copied on the email
    pub bcc_addresses: Vec<String>,

    /// When the message was acknowledged
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<PendingMessage> for PendingMessageResponse {
    fn from(message: PendingMessage) -> Self {
        Self {
            id: message.id,
            transaction_number: message.transaction_number,
            rule_id: message.rule_id,
            occurred_at: message.occurred_at,
            subject: message.subject,
            body_html: message.body_html,
            status: message.status.to_string(),
            comment: message.comment,
            to_addresses: message.to_addresses,
            bcc_addresses: message.bcc_addresses,
            sent_at: message.sent_at,
        }
    }
}

/// Pending messages response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListMessagesResponse {
    /// Messages in dispatch order
    pub messages: Vec<PendingMessageResponse>,
}

/// List the messages that the next dispatch cycle would send
#[utoipa::path(
    get,
    operation_id = "list_messages",
    tag = "Dispatch",
    path = "/v1/messages",
    responses(
        (status = StatusCode::OK, description = "Pending messages", body = ListMessagesResponse),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "Could not read pending messages", body = ErrorResponse),
    )
)]
pub async fn handler<D: DispatchService>(
    State(state): State<AppState<D>>,
) -> Result<Json<ListMessagesResponse>, ApiError> {
    let messages = state.dispatch.list_pending().await?;

    Ok(Json(ListMessagesResponse {
        messages: messages.into_iter().map(Into::into).collect(),
    }))
}
