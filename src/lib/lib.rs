#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Scheduled dispatch of pending emails from the database to an SMTP relay

pub mod domain;
pub mod infrastructure;
