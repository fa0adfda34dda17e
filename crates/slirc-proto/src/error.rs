//! Error types for the IRC protocol library.
//!
//! [`ProtocolError`] covers framing and encoding failures; a line that cannot
//! be parsed surfaces as [`ProtocolError::InvalidMessage`] carrying the
//! offending text and a [`MessageParseError`] cause.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Message exceeded maximum allowed length.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual message length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Tags section exceeded maximum allowed length.
    #[error("tags too long: {actual} bytes (limit: {limit})")]
    TagsTooLong {
        /// Actual tags length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Illegal control character in message.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),

    /// Failed to parse or represent an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The offending line (or its best rendering when encoding).
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

impl ProtocolError {
    /// Short label for logs and metrics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::MessageTooLong { .. } => "message_too_long",
            Self::TagsTooLong { .. } => "tags_too_long",
            Self::IllegalControlChar(_) => "illegal_control_char",
            Self::InvalidMessage { .. } => "invalid_message",
        }
    }
}

/// Errors encountered when parsing or building IRC messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was invalid or missing.
    #[error("invalid command")]
    InvalidCommand,

    /// An argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid message prefix.
    #[error("invalid prefix: {0}")]
    InvalidPrefix(String),

    /// Invalid character at specific position.
    #[error("invalid character {byte:#04x} at position {position}")]
    InvalidCharacterAt {
        /// The invalid byte value.
        byte: u8,
        /// Position in the message.
        position: usize,
    },

    /// Tags section was not properly terminated.
    #[error("unterminated tags section")]
    UnterminatedTags,

    /// Parsing error with position information.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte position where parsing failed.
        position: usize,
        /// Description of what was being parsed.
        context: String,
    },
}
