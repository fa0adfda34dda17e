//! Error types for slirc-bridge.
//!
//! Connection failures carry enough context to say which phase broke;
//! delivery and intake errors stay local to the bridge and never end the
//! process.

use std::time::Duration;

use slirc_proto::{HandshakeError, ProtocolError};
use thiserror::Error;

// ============================================================================
// Connection Errors (dial, registration, read/write loops)
// ============================================================================

/// Errors raised by the protocol connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Dial failed or timed out.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registration failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// A line could not be framed or parsed mid-session.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no data from server for {0:?}")]
    ReadTimeout(Duration),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("connection closed")]
    Closed,
}

impl ConnectionError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Handshake(_) => "handshake",
            Self::Protocol(_) => "parse",
            Self::Io(_) => "io",
            Self::ReadTimeout(_) => "read_timeout",
            Self::WriteTimeout(_) => "write_timeout",
            Self::Closed => "closed",
        }
    }
}

// ============================================================================
// Delivery Errors (HTTP event callbacks)
// ============================================================================

/// Failure to hand one event to the remote consumer.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("event request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("event endpoint answered {0}")]
    Status(u16),

    #[error("failed to read event response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DeliveryError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Status(_) => "status",
            Self::Body(_) => "body",
            Self::Encode(_) => "encode",
        }
    }
}

// ============================================================================
// Intake Errors (HTTP command intake)
// ============================================================================

/// Why a command could not be queued for the server.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The text cannot be sent as a single protocol line.
    #[error("message rejected: {0}")]
    Invalid(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,
}

impl IntakeError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid_message",
            Self::NotConnected => "not_connected",
        }
    }
}
