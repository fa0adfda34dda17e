//! Claim/release board for named shared resources.
//!
//! The board is an actor: one task owns the holder table and processes
//! requests sequentially, so no lock guards it. Channel users drive it
//! with `!claim <name>`, `!release <name>` and `!claims`.
//!
//! Resource names and holders compare under IRC casemapping.

use std::collections::HashMap;

use slirc_proto::{irc_eq, irc_to_lower};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

const REQUEST_QUEUE: usize = 64;

/// Requests accepted by the board.
#[derive(Debug)]
pub enum ClaimRequest {
    Claim {
        resource: String,
        holder: String,
        reply_tx: oneshot::Sender<ClaimOutcome>,
    },
    Release {
        resource: String,
        holder: String,
        reply_tx: oneshot::Sender<ReleaseOutcome>,
    },
    /// Current holders as `(resource, holder)`, sorted by resource.
    Status {
        reply_tx: oneshot::Sender<Vec<(String, String)>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Granted,
    AlreadyHeld,
    HeldBy(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    NotHeld,
    HeldBy(String),
}

/// A recognised channel command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimCommand<'a> {
    Claim(&'a str),
    Release(&'a str),
    List,
}

impl<'a> ClaimCommand<'a> {
    /// Parse channel text. `None` for anything that is not a board command.
    pub fn parse(text: &'a str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let command = words.next()?;
        let arg = words.next();
        if words.next().is_some() {
            return None;
        }
        match (command, arg) {
            ("!claim", Some(name)) => Some(Self::Claim(name)),
            ("!release", Some(name)) => Some(Self::Release(name)),
            ("!claims", None) => Some(Self::List),
            _ => None,
        }
    }
}

struct Entry {
    /// Name as first claimed, for display.
    resource: String,
    holder: String,
}

/// The actor owning the holder table.
pub struct ClaimBoard {
    holders: HashMap<String, Entry>,
}

impl ClaimBoard {
    /// Spawn the board and return a handle to it.
    ///
    /// The task ends once every handle is dropped.
    pub fn spawn() -> ClaimsHandle {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        let board = Self {
            holders: HashMap::new(),
        };

        tokio::spawn(async move {
            board.run(rx).await;
        });

        ClaimsHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<ClaimRequest>) {
        while let Some(request) = rx.recv().await {
            self.handle_request(request);
        }
        debug!("Claim board stopped");
    }

    // Reply send failures mean the requester went away; nothing to undo.
    fn handle_request(&mut self, request: ClaimRequest) {
        match request {
            ClaimRequest::Claim {
                resource,
                holder,
                reply_tx,
            } => {
                let _ = reply_tx.send(self.claim(resource, holder));
            }
            ClaimRequest::Release {
                resource,
                holder,
                reply_tx,
            } => {
                let _ = reply_tx.send(self.release(&resource, &holder));
            }
            ClaimRequest::Status { reply_tx } => {
                let mut list: Vec<_> = self
                    .holders
                    .values()
                    .map(|e| (e.resource.clone(), e.holder.clone()))
                    .collect();
                list.sort_by_key(|(resource, _)| irc_to_lower(resource));
                let _ = reply_tx.send(list);
            }
        }
    }

    fn claim(&mut self, resource: String, holder: String) -> ClaimOutcome {
        let key = irc_to_lower(&resource);
        match self.holders.get(&key) {
            Some(entry) if irc_eq(&entry.holder, &holder) => ClaimOutcome::AlreadyHeld,
            Some(entry) => ClaimOutcome::HeldBy(entry.holder.clone()),
            None => {
                self.holders.insert(key, Entry { resource, holder });
                ClaimOutcome::Granted
            }
        }
    }

    fn release(&mut self, resource: &str, holder: &str) -> ReleaseOutcome {
        let key = irc_to_lower(resource);
        match self.holders.get(&key) {
            None => ReleaseOutcome::NotHeld,
            Some(entry) if !irc_eq(&entry.holder, holder) => {
                ReleaseOutcome::HeldBy(entry.holder.clone())
            }
            Some(_) => {
                self.holders.remove(&key);
                ReleaseOutcome::Released
            }
        }
    }
}

/// Cloneable handle to a running [`ClaimBoard`].
///
/// Every call returns `None` if the board task is gone.
#[derive(Clone, Debug)]
pub struct ClaimsHandle {
    tx: mpsc::Sender<ClaimRequest>,
}

impl ClaimsHandle {
    pub async fn claim(&self, resource: &str, holder: &str) -> Option<ClaimOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ClaimRequest::Claim {
                resource: resource.to_owned(),
                holder: holder.to_owned(),
                reply_tx,
            })
            .await
            .ok()?;
        reply_rx.await.ok()
    }

    pub async fn release(&self, resource: &str, holder: &str) -> Option<ReleaseOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ClaimRequest::Release {
                resource: resource.to_owned(),
                holder: holder.to_owned(),
                reply_tx,
            })
            .await
            .ok()?;
        reply_rx.await.ok()
    }

    pub async fn status(&self) -> Option<Vec<(String, String)>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx.send(ClaimRequest::Status { reply_tx }).await.ok()?;
        reply_rx.await.ok()
    }

    /// Run a channel command from `nick` and return the reply to post.
    pub async fn handle_command(&self, nick: &str, command: ClaimCommand<'_>) -> Option<String> {
        let reply = match command {
            ClaimCommand::Claim(resource) => match self.claim(resource, nick).await? {
                ClaimOutcome::Granted => format!("{nick}: you now hold {resource}"),
                ClaimOutcome::AlreadyHeld => format!("{nick}: you already hold {resource}"),
                ClaimOutcome::HeldBy(holder) => format!("{nick}: {resource} is held by {holder}"),
            },
            ClaimCommand::Release(resource) => match self.release(resource, nick).await? {
                ReleaseOutcome::Released => format!("{nick}: released {resource}"),
                ReleaseOutcome::NotHeld => format!("{nick}: {resource} is not claimed"),
                ReleaseOutcome::HeldBy(holder) => {
                    format!("{nick}: {resource} is held by {holder}, not you")
                }
            },
            ClaimCommand::List => {
                let list = self.status().await?;
                if list.is_empty() {
                    "no claims".to_string()
                } else {
                    let entries: Vec<_> = list
                        .iter()
                        .map(|(resource, holder)| format!("{resource} ({holder})"))
                        .collect();
                    format!("claims: {}", entries.join(", "))
                }
            }
        };
        Some(reply)
    }
}
