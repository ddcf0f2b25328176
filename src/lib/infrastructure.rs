//! Adapters for storage, mail delivery, scheduling and HTTP

pub mod db;
pub mod email;
pub mod http;
pub mod scheduler;
