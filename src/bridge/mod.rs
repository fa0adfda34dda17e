//! Bridging between the IRC channel and the HTTP event/command API.
//!
//! - [`dispatcher`]: inbound classification, keep-alive and bounded delivery
//! - [`delivery`]: the [`EventSink`] seam and its HTTP implementation
//! - [`intake`]: outbound messages from the HTTP side
//! - [`claims`]: optional claim/release board answered in the channel

pub mod claims;
pub mod delivery;
pub mod dispatcher;
mod event;
pub mod intake;

pub use claims::{ClaimBoard, ClaimsHandle};
pub use delivery::{EventSink, HttpEventSink};
pub use dispatcher::{Dispatcher, Disposition, classify};
pub use event::ChannelMessageEvent;
pub use intake::CommandIntake;
