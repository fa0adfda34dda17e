//! Command intake: messages posted from the HTTP side into the channel.

use slirc_proto::Message;
use tracing::debug;

use crate::error::IntakeError;
use crate::network::ConnectionHandle;

/// Validates outbound text and queues it on the connection.
#[derive(Clone, Debug)]
pub struct CommandIntake {
    handle: ConnectionHandle,
}

impl CommandIntake {
    pub fn new(handle: ConnectionHandle) -> Self {
        Self { handle }
    }

    /// Queue `PRIVMSG <channel> :<text>`.
    ///
    /// Success means the message was accepted into the send queue, not that
    /// it reached the server. Waits while the queue is full.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), IntakeError> {
        let msg = Message::privmsg(channel, text);
        // Reject here so the caller learns about it; the writer would only log.
        msg.encode()?;

        if self.handle.is_closed() {
            return Err(IntakeError::NotConnected);
        }
        debug!(channel = %channel, "Queueing message from intake");
        // The handle only ever fails with Closed.
        self.handle
            .send(msg)
            .await
            .map_err(|_| IntakeError::NotConnected)
    }
}
