//! Pending message model

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};

use crate::domain::dispatch::errors::FetchMessagesError;

/// Origin marker of a stored message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordType {
    /// The message has already been acknowledged as sent
    Send,

    /// The message was added and is waiting to be sent
    Add,
}

impl RecordType {
    /// The value stored in the record type column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "SEND",
            Self::Add => "ADD",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = FetchMessagesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEND" => Ok(Self::Send),
            "ADD" => Ok(Self::Add),
            other => Err(FetchMessagesError::InvalidRecordType(other.to_string())),
        }
    }
}

/// A message waiting to be dispatched, as read from storage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingMessage {
    /// Storage-assigned identifier, used for fetch ordering
    pub id: i64,

    /// Business key used to acknowledge delivery
    pub transaction_number: String,

    /// Classification tag
    pub rule_id: String,

    /// Date the record belongs to, formatted `YYYY-MM-DD`
    pub occurred_at: String,

    /// The email subject
    pub subject: String,

    /// HTML fragment placed inside the email envelope
    pub body_html: String,

    /// Origin marker
    pub status: RecordType,

    /// Free-text comment
    pub comment: String,

    /// Parsed `to` recipients
    pub to_addresses: Vec<String>,

    /// Parsed recipients of the storage `bcc` column
    pub bcc_addresses: Vec<String>,

    /// When storage recorded the message as sent
    pub sent_at: Option<DateTime<Utc>>,
}
