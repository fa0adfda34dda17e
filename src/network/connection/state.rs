//! Shared connection state with sticky terminal states.

use std::fmt::Display;
use std::sync::Arc;

use slirc_proto::ConnectionState;
use tokio::sync::watch;

/// Published [`ConnectionState`]. Once `Closed` or `Failed` is stored, no
/// further transition is accepted, so the first terminal cause wins.
#[derive(Clone, Debug)]
pub(crate) struct StateCell(Arc<watch::Sender<ConnectionState>>);

impl StateCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Connecting);
        Self(Arc::new(tx))
    }

    pub fn get(&self) -> ConnectionState {
        self.0.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.0.subscribe()
    }

    /// Move to `next` unless already terminal. Returns whether it applied.
    pub fn transition(&self, next: ConnectionState) -> bool {
        self.0.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                false
            } else {
                *state = next;
                true
            }
        })
    }

    pub fn fail(&self, reason: impl Display) -> bool {
        self.transition(ConnectionState::Failed(reason.to_string()))
    }

    pub fn close(&self) -> bool {
        self.transition(ConnectionState::Closed)
    }
}
