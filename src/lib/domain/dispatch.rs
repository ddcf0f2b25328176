//! Pending message dispatch pipeline.
//!
//! A cycle fetches the messages that are eligible today, renders them into
//! [`OutboundEmail`](crate::domain::communication::mailer::OutboundEmail)s,
//! hands the whole batch to the [`Mailer`](crate::domain::communication::mailer::Mailer)
//! and finally acknowledges each message through the [`StatusCommitter`].

mod addresses;
mod builder;
mod committer;
mod message;
mod repository;
mod service;

pub mod errors;

pub use addresses::{parse_addresses, ADDRESS_DELIMITER};
pub use builder::{EmailBuilder, HtmlEnvelope, DEFAULT_FONT_FAMILY};
pub use committer::StatusCommitter;
pub use message::{PendingMessage, RecordType};
pub use repository::{MessageRepository, FETCH_LIMIT};
pub use service::{CycleReport, DispatchService, DispatchServiceImpl};
