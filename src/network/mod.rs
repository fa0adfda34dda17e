//! Network module.
//!
//! Contains the client [`Connection`] to the upstream IRC server.

mod connection;

pub use connection::{Connection, ConnectionHandle, ConnectionOptions};
