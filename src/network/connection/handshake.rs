//! Registration driver: runs the sans-IO machine against a live connection.

use std::time::Duration;

use slirc_proto::{
    ConnectionState, HandshakeError, RegistrationConfig, RegistrationMachine, RegistrationStep,
};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

use super::Connection;

/// Send NICK/USER/JOIN and wait for the welcome, all within `deadline`.
///
/// NOTICEs are skipped; anything else before 001 fails registration.
pub(super) async fn register(
    conn: &Connection,
    config: RegistrationConfig,
    deadline: Duration,
) -> Result<(), HandshakeError> {
    let deadline = Instant::now() + deadline;
    let mut machine = RegistrationMachine::new(config);

    conn.state.transition(ConnectionState::Registering);
    for msg in machine.start() {
        match timeout_at(deadline, conn.send(msg)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return Err(machine.fail(HandshakeError::ConnectionClosed)),
            Err(_) => return Err(machine.fail(HandshakeError::Timeout)),
        }
    }

    loop {
        let msg = match timeout_at(deadline, conn.receive()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => return Err(machine.fail(HandshakeError::ConnectionClosed)),
            Err(_) => return Err(machine.fail(HandshakeError::Timeout)),
        };

        match machine.feed(&msg) {
            RegistrationStep::Pending => debug!(line = %msg, "Skipping notice during registration"),
            RegistrationStep::Complete => {
                conn.state.transition(ConnectionState::Ready);
                info!("Registered with server");
                return Ok(());
            }
            RegistrationStep::Failed(err) => return Err(err),
        }
    }
}
