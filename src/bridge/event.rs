//! Channel message events handed to the remote consumer.

use slirc_proto::Prefix;

/// One channel message seen on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessageEvent {
    pub channel: String,
    /// Full message prefix, e.g. `alice!u@h`.
    pub originator: String,
    pub text: String,
}

impl ChannelMessageEvent {
    /// Nickname part of the originator, if it names a user.
    pub fn nick(&self) -> Option<String> {
        Prefix::new_from_str(&self.originator)
            .nick()
            .map(str::to_owned)
    }
}
