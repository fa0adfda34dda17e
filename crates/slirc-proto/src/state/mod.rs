//! Sans-IO client registration state machine.
//!
//! The machine performs no I/O and keeps no timers: the caller sends the
//! messages returned by [`RegistrationMachine::start`], feeds every inbound
//! message to [`RegistrationMachine::feed`] and enforces its own deadline,
//! reporting expiry through [`RegistrationMachine::fail`].
//!
//! # Example
//!
//! ```
//! use slirc_proto::state::{RegistrationConfig, RegistrationMachine, RegistrationStep};
//! use slirc_proto::Message;
//!
//! let mut machine = RegistrationMachine::new(RegistrationConfig::new("bot", "#test"));
//!
//! // NICK, USER, JOIN
//! let outbound = machine.start();
//! assert_eq!(outbound.len(), 3);
//!
//! let notice = Message::decode(":irc.local NOTICE * :Looking up your hostname").unwrap();
//! assert_eq!(machine.feed(&notice.message), RegistrationStep::Pending);
//!
//! let welcome = Message::decode(":irc.local 001 bot :Welcome").unwrap();
//! assert_eq!(machine.feed(&welcome.message), RegistrationStep::Complete);
//! ```

mod tracker;

pub use tracker::RegistrationMachine;

/// Lifecycle of a client connection.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Dialing, nothing sent yet.
    #[default]
    Connecting,
    /// NICK/USER/JOIN sent, awaiting welcome (001).
    Registering,
    /// Received 001; normal operation.
    Ready,
    /// Shut down cleanly, by us or by the peer.
    Closed,
    /// Terminated by an error.
    Failed(String),
}

impl ConnectionState {
    /// `Closed` and `Failed` are final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

/// Identity used during registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationConfig {
    /// Desired nickname.
    pub nickname: String,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Channel joined once registered.
    pub channel: String,
    /// Channel key, if the channel requires one.
    pub channel_key: Option<String>,
}

impl RegistrationConfig {
    /// Use `nickname` for username and realname too.
    pub fn new(nickname: impl Into<String>, channel: impl Into<String>) -> Self {
        let nickname = nickname.into();
        Self {
            username: nickname.clone(),
            realname: nickname.clone(),
            nickname,
            channel: channel.into(),
            channel_key: None,
        }
    }
}

/// Outcome of feeding one message to the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationStep {
    /// Keep waiting.
    Pending,
    /// Registration completed.
    Complete,
    /// Registration failed.
    Failed(HandshakeError),
}

/// Errors that can occur during registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeError {
    /// Something other than NOTICE or 001 arrived first.
    Unexpected(String),
    /// The registration deadline passed.
    Timeout,
    /// The connection ended before the welcome.
    ConnectionClosed,
}

impl std::fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unexpected(line) => write!(f, "received unexpected message: {}", line),
            Self::Timeout => write!(f, "timeout waiting for registration"),
            Self::ConnectionClosed => write!(f, "connection closed during registration"),
        }
    }
}

impl std::error::Error for HandshakeError {}
