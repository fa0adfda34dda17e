//! Registration state machine implementation.

use crate::Message;

use super::{ConnectionState, HandshakeError, RegistrationConfig, RegistrationStep};

/// Drives NICK/USER/JOIN registration to the server welcome.
#[derive(Debug)]
pub struct RegistrationMachine {
    config: RegistrationConfig,
    state: ConnectionState,
    failure: Option<HandshakeError>,
}

impl RegistrationMachine {
    /// Create a machine in [`ConnectionState::Connecting`].
    #[must_use]
    pub fn new(config: RegistrationConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Connecting,
            failure: None,
        }
    }

    /// Get the current state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Begin registration.
    ///
    /// Returns the messages to send, in order. Calling it again after the
    /// first time returns nothing.
    pub fn start(&mut self) -> Vec<Message> {
        if self.state != ConnectionState::Connecting {
            return Vec::new();
        }
        self.state = ConnectionState::Registering;

        let join = match self.config.channel_key {
            Some(ref key) => Message::join_with_key(self.config.channel.as_str(), key.as_str()),
            None => Message::join(self.config.channel.as_str()),
        };

        vec![
            Message::nick(self.config.nickname.as_str()),
            Message::user(self.config.username.as_str(), self.config.realname.as_str()),
            join,
        ]
    }

    /// Process one inbound message.
    pub fn feed(&mut self, msg: &Message) -> RegistrationStep {
        match self.state {
            ConnectionState::Connecting => RegistrationStep::Pending,
            ConnectionState::Ready => RegistrationStep::Complete,
            ConnectionState::Closed | ConnectionState::Failed(_) => self.failed_step(),
            ConnectionState::Registering => {
                if msg.command == "001" {
                    self.state = ConnectionState::Ready;
                    RegistrationStep::Complete
                } else if msg.is_command("NOTICE") {
                    RegistrationStep::Pending
                } else {
                    RegistrationStep::Failed(self.fail(HandshakeError::Unexpected(msg.to_string())))
                }
            }
        }
    }

    /// Abort registration, e.g. on deadline expiry.
    ///
    /// Has no effect once the machine is `Ready` or already failed; the
    /// returned error is the one that actually ended registration.
    pub fn fail(&mut self, err: HandshakeError) -> HandshakeError {
        if let Some(ref existing) = self.failure {
            return existing.clone();
        }
        if self.state == ConnectionState::Ready {
            return err;
        }
        self.state = ConnectionState::Failed(err.to_string());
        self.failure = Some(err.clone());
        err
    }

    fn failed_step(&self) -> RegistrationStep {
        RegistrationStep::Failed(
            self.failure
                .clone()
                .unwrap_or(HandshakeError::ConnectionClosed),
        )
    }
}
