//! Dispatcher: turns inbound protocol messages into keep-alive replies and
//! channel events.
//!
//! Classification is pure ([`classify`]); the [`Dispatcher`] acts on the
//! result. Deliveries run on spawned tasks bounded by a semaphore, so a slow
//! consumer never stalls the read path. When every slot is busy the event is
//! dropped.

use std::sync::Arc;

use slirc_proto::{ChannelExt, Message, irc_eq};
use tokio::sync::Semaphore;
use tracing::{debug, info, trace, warn};

use super::claims::{ClaimCommand, ClaimsHandle};
use super::delivery::EventSink;
use super::event::ChannelMessageEvent;
use crate::metrics;
use crate::network::{Connection, ConnectionHandle};

/// What to do with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Answer a PING with this PONG.
    KeepAlive(Message),
    /// Forward to the event consumer.
    Deliver(ChannelMessageEvent),
    /// Not for us.
    Ignore(&'static str),
    /// Recognised command with missing parameters.
    Malformed(&'static str),
}

/// Tags marking a message as sent by a bot, possibly ourselves.
const BOT_TAGS: [&str; 2] = ["bot", "draft/bot"];

/// Decide what an inbound message means to the bridge.
pub fn classify(msg: &Message, our_nick: &str) -> Disposition {
    if msg.is_command("PING") {
        return match msg.param(0) {
            Some(payload) => Disposition::KeepAlive(Message::pong(payload)),
            None => Disposition::Malformed("PING without payload"),
        };
    }
    if !msg.is_command("PRIVMSG") {
        return Disposition::Ignore("not a PRIVMSG");
    }

    let (target, text) = match (msg.param(0), msg.param(1)) {
        (Some(target), Some(text)) => (target, text),
        _ => return Disposition::Malformed("PRIVMSG missing target or text"),
    };
    if !target.has_channel_prefix() {
        return Disposition::Ignore("not a channel message");
    }
    if is_self_reply(msg, our_nick) {
        return Disposition::Ignore("self reply");
    }

    Disposition::Deliver(ChannelMessageEvent {
        channel: target.to_owned(),
        originator: msg.prefix.clone().unwrap_or_default(),
        text: text.to_owned(),
    })
}

/// Our own echoed lines and anything flagged as bot traffic.
fn is_self_reply(msg: &Message, our_nick: &str) -> bool {
    if msg
        .source_nickname()
        .is_some_and(|nick| irc_eq(nick, our_nick))
    {
        return true;
    }
    BOT_TAGS.iter().any(|tag| msg.has_tag(tag))
}

/// Consumes a connection's receive queue until it closes.
pub struct Dispatcher {
    nick: String,
    sink: Arc<dyn EventSink>,
    claims: Option<ClaimsHandle>,
    permits: Arc<Semaphore>,
    max_in_flight: u32,
}

impl Dispatcher {
    /// `nick` is the nickname we registered with.
    pub fn new(nick: impl Into<String>, sink: Arc<dyn EventSink>, max_in_flight: usize) -> Self {
        let max_in_flight = u32::try_from(max_in_flight).unwrap_or(u32::MAX).max(1);
        Self {
            nick: nick.into(),
            sink,
            claims: None,
            permits: Arc::new(Semaphore::new(max_in_flight as usize)),
            max_in_flight,
        }
    }

    /// Answer claim board commands seen in the channel.
    pub fn with_claims(mut self, claims: ClaimsHandle) -> Self {
        self.claims = Some(claims);
        self
    }

    /// Run until the connection stops producing messages, then wait for
    /// in-flight deliveries.
    pub async fn run(&self, conn: &Connection) {
        let handle = conn.handle();
        while let Some(msg) = conn.receive().await {
            self.dispatch(msg, &handle).await;
        }
        info!("Receive queue closed; waiting for in-flight deliveries");
        self.drain().await;
    }

    /// Wait until every spawned delivery has finished.
    pub async fn drain(&self) {
        // Never closed, so this only fails if the semaphore is dropped.
        let _ = self.permits.acquire_many(self.max_in_flight).await;
    }

    async fn dispatch(&self, msg: Message, handle: &ConnectionHandle) {
        match classify(&msg, &self.nick) {
            Disposition::KeepAlive(pong) => {
                if let Err(e) = handle.send(pong).await {
                    debug!(error = %e, "Could not answer PING");
                    return;
                }
                metrics::record_keepalive();
            }
            Disposition::Ignore(reason) => trace!(line = %msg, reason, "Ignoring message"),
            Disposition::Malformed(reason) => warn!(line = %msg, reason, "Discarding malformed message"),
            Disposition::Deliver(event) => {
                self.run_claims(&event, handle).await;
                self.deliver(event);
            }
        }
    }

    async fn run_claims(&self, event: &ChannelMessageEvent, handle: &ConnectionHandle) {
        let Some(claims) = &self.claims else {
            return;
        };
        let Some(command) = ClaimCommand::parse(&event.text) else {
            return;
        };
        let Some(nick) = event.nick() else {
            return;
        };

        match claims.handle_command(&nick, command).await {
            Some(reply) => {
                if let Err(e) = handle.send(Message::privmsg(&event.channel, reply)).await {
                    debug!(error = %e, "Could not post claim reply");
                }
            }
            None => warn!("Claim board is not running"),
        }
    }

    fn deliver(&self, event: ChannelMessageEvent) {
        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(channel = %event.channel, "All delivery slots busy; dropping event");
                metrics::record_event_dropped();
                return;
            }
        };

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            let _permit = permit;
            match sink.deliver(&event).await {
                Ok(()) => {
                    debug!(channel = %event.channel, "Event delivered");
                    metrics::record_event_delivered();
                }
                Err(e) => {
                    warn!(channel = %event.channel, error = %e, code = e.error_code(), "Event delivery failed");
                    metrics::record_delivery_failure(e.error_code());
                }
            }
        });
    }
}
