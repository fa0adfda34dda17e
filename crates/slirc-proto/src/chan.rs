//! Channel name utilities.
//!
//! # Reference
//! - RFC 2812 Section 1.3: Channel names

/// Extension trait for checking if a string is an IRC channel name.
pub trait ChannelExt {
    /// True for names that start with `#`, `&`, `+` or `!`, are at most 50
    /// characters, and contain no space, comma or control character.
    fn is_channel_name(&self) -> bool;

    /// True when the first character is a channel type marker. Looser than
    /// [`is_channel_name`](Self::is_channel_name): this is how a message
    /// target is told apart from a nickname, whatever the server allows.
    fn has_channel_prefix(&self) -> bool;
}

impl ChannelExt for str {
    fn is_channel_name(&self) -> bool {
        if !self.has_channel_prefix() {
            return false;
        }
        if self.chars().count() > 50 {
            return false;
        }
        self.chars()
            .skip(1)
            .all(|c| c != ' ' && c != ',' && !c.is_control())
    }

    fn has_channel_prefix(&self) -> bool {
        self.starts_with(['#', '&', '+', '!'])
    }
}

impl ChannelExt for String {
    fn is_channel_name(&self) -> bool {
        self.as_str().is_channel_name()
    }

    fn has_channel_prefix(&self) -> bool {
        self.as_str().has_channel_prefix()
    }
}
