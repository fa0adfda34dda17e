//! # slirc-proto
//!
//! IRC wire protocol support for the slirc bridge: a checked line codec,
//! tokio framing, and a sans-IO client registration state machine.
//!
//! ## Features
//!
//! - Line decoding with IRCv3 tags, prefix, command and up to 15 parameters
//! - Soft truncation of over-long inbound lines, strict rejection outbound
//! - `tokio_util::codec` framing (`tokio` feature, on by default)
//! - NICK/USER/JOIN registration driven to the 001 welcome
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_proto::Message;
//!
//! let decoded = Message::decode("@bot :relay!r@h PRIVMSG #rust :Hello!\r\n").unwrap();
//! assert!(decoded.message.has_tag("bot"));
//! assert!(!decoded.truncated);
//!
//! let line = Message::privmsg("#rust", "Hello, world!").encode().unwrap();
//! assert_eq!(line, "PRIVMSG #rust :Hello, world!\r\n");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod chan;
pub mod error;
#[cfg(feature = "tokio")]
pub mod irc;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod prefix;
pub mod state;

pub use self::casemap::{irc_eq, irc_lower_char, irc_to_lower};
pub use self::chan::ChannelExt;
pub use self::error::{MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
#[cfg(feature = "tokio")]
pub use self::line::{Line, LineCodec, MAX_FRAME_LEN};
pub use self::message::{Decoded, Message, Tag, MAX_LINE_LEN, MAX_TAGS_LEN};
pub use self::prefix::Prefix;
pub use self::state::{
    ConnectionState, HandshakeError, RegistrationConfig, RegistrationMachine, RegistrationStep,
};
