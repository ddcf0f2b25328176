//! Message repository module

use async_trait::async_trait;
use chrono::NaiveDate;

#[cfg(test)]
use mockall::mock;

use crate::domain::dispatch::{errors::FetchMessagesError, PendingMessage};

/// Maximum number of messages fetched in one cycle
pub const FETCH_LIMIT: i64 = 100;

/// Source of pending messages
#[async_trait]
pub trait MessageRepository: Clone + Send + Sync + 'static {
    /// Runs the storage-side step that materialises newly eligible messages
    async fn generate_pending(&self) -> Result<(), FetchMessagesError>;

    /// Lists up to [`FETCH_LIMIT`] messages eligible on `day`, oldest first.
    ///
    /// A message is eligible while its record type is `ADD`, it belongs to
    /// `day` and it has a `to` column. Either every row is returned or an
    /// error is.
    async fn list_eligible(&self, day: NaiveDate)
        -> Result<Vec<PendingMessage>, FetchMessagesError>;

    /// Checks that the storage connection is alive
    async fn ping(&self) -> Result<(), FetchMessagesError>;
}

#[cfg(test)]
mock! {
    pub MessageRepository {}

    impl Clone for MessageRepository {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl MessageRepository for MessageRepository {
        async fn generate_pending(&self) -> Result<(), FetchMessagesError>;
        async fn list_eligible(&self, day: NaiveDate) -> Result<Vec<PendingMessage>, FetchMessagesError>;
        async fn ping(&self) -> Result<(), FetchMessagesError>;
    }
}
