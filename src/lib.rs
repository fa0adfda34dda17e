//! slirc-bridge - Straylight IRC bridge
//!
//! Relays one IRC channel to an HTTP event consumer and accepts messages
//! back through an HTTP command endpoint.

pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod network;
