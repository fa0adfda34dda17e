//! Read loop: socket → decode → receive queue.

use std::time::Duration;

use futures_util::StreamExt;
use slirc_proto::{IrcCodec, Message, ProtocolError};
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::StateCell;
use crate::error::ConnectionError;

/// Read until EOF, error, deadline or shutdown. Dropping `tx` on return
/// closes the receive queue.
pub(super) async fn run(
    mut stream: FramedRead<OwnedReadHalf, IrcCodec>,
    tx: mpsc::Sender<Message>,
    shutdown: CancellationToken,
    state: StateCell,
    read_timeout: Duration,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = tokio::time::timeout(read_timeout, stream.next()) => next,
        };

        let decoded = match next {
            Err(_elapsed) => {
                warn!(timeout = ?read_timeout, "No data from server before read deadline");
                state.fail(ConnectionError::ReadTimeout(read_timeout));
                break;
            }
            Ok(None) => {
                info!("Server closed the connection");
                state.close();
                break;
            }
            Ok(Some(Err(e))) => {
                warn!(error = %e, code = e.error_code(), "Read failed");
                let err = match e {
                    ProtocolError::Io(io) => ConnectionError::Io(io),
                    other => ConnectionError::Protocol(other),
                };
                state.fail(err);
                break;
            }
            Ok(Some(Ok(decoded))) => decoded,
        };

        if decoded.truncated {
            warn!(command = %decoded.message.command, "Inbound line exceeded 512 bytes and was truncated");
        }
        debug!(line = %decoded.message, "read message");
        crate::metrics::record_message_received();

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            sent = tx.send(decoded.message) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Read loop finished");
}
