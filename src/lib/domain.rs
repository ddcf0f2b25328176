//! Domain types, traits and services

pub mod communication;
pub mod dispatch;
