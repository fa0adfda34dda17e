//! Write loop: send queue → encode → socket.

use std::time::Duration;

use futures_util::SinkExt;
use slirc_proto::{IrcCodec, Message, ProtocolError};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::state::StateCell;
use crate::error::ConnectionError;

enum WriteOutcome {
    Written,
    /// Rejected by the encoder; nothing reached the socket.
    Skipped(ProtocolError),
    Fatal(ConnectionError),
}

async fn write_one(
    sink: &mut FramedWrite<OwnedWriteHalf, IrcCodec>,
    msg: Message,
    write_timeout: Duration,
) -> WriteOutcome {
    debug!(line = %msg, "writing message");
    // send() flushes; a zero-length write surfaces as io::ErrorKind::WriteZero.
    match tokio::time::timeout(write_timeout, sink.send(msg)).await {
        Ok(Ok(())) => WriteOutcome::Written,
        Ok(Err(ProtocolError::Io(e))) => WriteOutcome::Fatal(ConnectionError::Io(e)),
        Ok(Err(e)) => WriteOutcome::Skipped(e),
        Err(_elapsed) => WriteOutcome::Fatal(ConnectionError::WriteTimeout(write_timeout)),
    }
}

/// Write queued messages in order until `closed` fires, then drain what is
/// left and shut down the write half.
///
/// After a fatal write error the loop cancels `closed`, which fails new and
/// waiting sends, and discards whatever is still queued. Only the write
/// side is affected; the read loop carries on.
pub(super) async fn run(
    mut sink: FramedWrite<OwnedWriteHalf, IrcCodec>,
    mut rx: mpsc::Receiver<Message>,
    closed: CancellationToken,
    state: StateCell,
    write_timeout: Duration,
) {
    let mut broken = false;

    loop {
        let msg = tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
            _ = closed.cancelled() => break,
        };
        if broken {
            continue;
        }
        broken = !handle(&mut sink, msg, write_timeout, &state, &closed).await;
    }

    // No new producers from here on; flush what was accepted before close.
    rx.close();
    while let Some(msg) = rx.recv().await {
        if !broken {
            broken = !handle(&mut sink, msg, write_timeout, &state, &closed).await;
        }
    }

    if !broken {
        match tokio::time::timeout(write_timeout, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Error shutting down write half"),
            Err(_) => debug!("Timed out shutting down write half"),
        }
    }
    debug!("Write loop finished");
}

/// Returns false once the socket is unusable.
async fn handle(
    sink: &mut FramedWrite<OwnedWriteHalf, IrcCodec>,
    msg: Message,
    write_timeout: Duration,
    state: &StateCell,
    closed: &CancellationToken,
) -> bool {
    match write_one(sink, msg, write_timeout).await {
        WriteOutcome::Written => true,
        WriteOutcome::Skipped(e) => {
            warn!(error = %e, code = e.error_code(), "Dropping message the encoder rejected");
            true
        }
        WriteOutcome::Fatal(e) => {
            error!(error = %e, code = e.error_code(), "Write failed; discarding queued messages");
            state.fail(&e);
            closed.cancel();
            false
        }
    }
}
