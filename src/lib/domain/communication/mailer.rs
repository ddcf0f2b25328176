//! Email service module

mod errors;
mod message;

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

pub use errors::MailerError;
pub use message::OutboundEmail;

/// Email service
#[async_trait]
pub trait Mailer: Clone + Send + Sync + 'static {
    /// Send a batch of emails in a single transport session
    ///
    /// # Arguments
    /// * `emails` - The [`OutboundEmail`]s to send, in delivery order.
    ///
    /// # Returns
    /// [`Ok`] only if every email in the batch was accepted by the relay. If
    /// any email cannot be converted for the transport, nothing is sent.
    async fn send_batch(&self, emails: &[OutboundEmail]) -> Result<(), MailerError>;
}

#[cfg(test)]
mock! {
    pub Mailer {}

    impl Clone for Mailer {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl Mailer for Mailer {
        async fn send_batch(&self, emails: &[OutboundEmail]) -> Result<(), MailerError>;
    }
}
