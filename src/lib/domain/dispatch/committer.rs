//! Delivery acknowledgement

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use crate::domain::dispatch::errors::MarkSentError;

/// Records delivered messages as sent in the backing store
#[async_trait]
pub trait StatusCommitter: Clone + Send + Sync + 'static {
    /// Marks the message identified by `transaction_number` as sent
    async fn mark_sent(&self, transaction_number: &str) -> Result<(), MarkSentError>;
}

#[cfg(test)]
mock! {
    pub StatusCommitter {}

    impl Clone for StatusCommitter {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl StatusCommitter for StatusCommitter {
        async fn mark_sent(&self, transaction_number: &str) -> Result<(), MarkSentError>;
    }
}
