//! Error types for the dispatch pipeline

use thiserror::Error;

use crate::domain::communication::mailer::MailerError;

/// Errors that can occur when fetching pending messages
#[derive(Debug, Error)]
pub enum FetchMessagesError {
    /// The storage-side generation step failed
    #[error("failed to generate pending messages: {0}")]
    GenerateFailed(anyhow::Error),

    /// The eligible rows could not be queried or read
    #[error("failed to query pending messages: {0}")]
    QueryFailed(anyhow::Error),

    /// A row carried a record type other than `SEND` or `ADD`
    #[error("invalid record type \"{0}\"")]
    InvalidRecordType(String),

    /// The storage connection is not available
    #[error("storage is unavailable: {0}")]
    Unavailable(anyhow::Error),
}

/// Errors that can occur when acknowledging a message as sent
#[derive(Debug, Error)]
pub enum MarkSentError {
    /// Unknown error
    #[error(transparent)]
    UnknownError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for MarkSentError {
    fn from(err: sqlx::Error) -> Self {
        MarkSentError::UnknownError(err.into())
    }
}

/// Errors that abort a dispatch cycle
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Nothing was sent; every message stays pending
    #[error(transparent)]
    Fetch(#[from] FetchMessagesError),

    /// The batch was rejected by the mail transport; nothing was acknowledged
    #[error("failed to send emails: {0}")]
    Send(#[from] MailerError),

    /// The batch was delivered but acknowledgement stopped part way through.
    /// The first `committed` messages are marked as sent, the rest stay pending.
    #[error("failed to mark \"{transaction_number}\" as sent after {committed} acknowledgements: {source}")]
    Commit {
        /// The message whose acknowledgement failed
        transaction_number: String,

        /// How many messages of the batch were acknowledged before the failure
        committed: usize,

        /// The underlying error
        source: MarkSentError,
    },
}
