//! Outbound email abstractions

pub mod mailer;
