use std::borrow::Cow;

use crate::chan::ChannelExt;
use crate::prefix::Prefix;

/// An owned IRC message.
///
/// Holds optional IRCv3 tags, the optional origin prefix, the command token
/// and its ordered parameters. Only the last parameter may contain spaces.
///
/// # Example
///
/// ```
/// use slirc_proto::Message;
///
/// let msg = Message::decode(":nick!user@host PRIVMSG #channel :Hello!")
///     .unwrap()
///     .message;
/// assert_eq!(msg.command, "PRIVMSG");
/// assert_eq!(msg.params, vec!["#channel", "Hello!"]);
///
/// let reply = Message::privmsg("#channel", "Hi there");
/// assert_eq!(reply.encode().unwrap(), "PRIVMSG #channel :Hi there\r\n");
/// ```
#[derive(Clone, Debug)]
pub struct Message {
    /// IRCv3 message tags (e.g., `time`, `msgid`).
    pub tags: Option<Vec<Tag>>,
    /// Message origin as sent on the wire (e.g., `nick!user@host`).
    pub prefix: Option<String>,
    /// The command name or three-digit numeric.
    pub command: String,
    /// Command parameters, trailing included.
    pub params: Vec<String>,
}

/// An empty tag list encodes to nothing, so it compares equal to `None`.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.tag_list() == other.tag_list()
            && self.prefix == other.prefix
            && self.command == other.command
            && self.params == other.params
    }
}

impl Eq for Message {}

impl Message {
    /// Create a message without tags or prefix.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Message {
            tags: None,
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Parsed view of the prefix, if present.
    pub fn source(&self) -> Option<Prefix> {
        self.prefix.as_deref().map(Prefix::new_from_str)
    }

    /// Get the nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        if prefix.contains('!') || prefix.contains('@') {
            prefix.split(['!', '@']).next().filter(|n| !n.is_empty())
        } else if prefix.contains('.') || prefix.is_empty() {
            // Bare dotted names are servers
            None
        } else {
            Some(prefix)
        }
    }

    /// True when the command matches `command`, ignoring ASCII case.
    pub fn is_command(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// Get the parameter at `index`.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The target channel of a channel PRIVMSG/NOTICE.
    pub fn channel_target(&self) -> Option<&str> {
        if !self.is_command("PRIVMSG") && !self.is_command("NOTICE") {
            return None;
        }
        self.param(0).filter(|target| target.is_channel_name())
    }

    /// Get the value of an IRCv3 tag by key.
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|Tag(k, _)| k.as_ref() == key)
            .and_then(|Tag(_, v)| v.as_deref())
    }

    fn tag_list(&self) -> &[Tag] {
        self.tags.as_deref().unwrap_or_default()
    }

    /// True when the tag is present, with or without a value.
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|Tag(k, _)| k.as_ref() == key))
    }

    /// Create a PRIVMSG message to a target with text
    #[must_use]
    pub fn privmsg<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Message::new("PRIVMSG", [target.into(), text.into()])
    }

    /// Create a NOTICE message to a target with text
    #[must_use]
    pub fn notice<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Message::new("NOTICE", [target.into(), text.into()])
    }

    /// Create a JOIN message for a channel
    #[must_use]
    pub fn join<C>(channel: C) -> Self
    where
        C: Into<String>,
    {
        Message::new("JOIN", [channel.into()])
    }

    /// Create a JOIN message for a channel with a key
    #[must_use]
    pub fn join_with_key<C, K>(channel: C, key: K) -> Self
    where
        C: Into<String>,
        K: Into<String>,
    {
        Message::new("JOIN", [channel.into(), key.into()])
    }

    /// Create a NICK message
    #[must_use]
    pub fn nick<N>(nickname: N) -> Self
    where
        N: Into<String>,
    {
        Message::new("NICK", [nickname.into()])
    }

    /// Create a USER message for registration.
    ///
    /// Produces `USER <username> <username> 0 <realname>`.
    #[must_use]
    pub fn user<U, R>(username: U, realname: R) -> Self
    where
        U: Into<String>,
        R: Into<String>,
    {
        let username = username.into();
        Message::new(
            "USER",
            [username.clone(), username, "0".to_string(), realname.into()],
        )
    }

    /// Create a PING message
    #[must_use]
    pub fn ping<S>(token: S) -> Self
    where
        S: Into<String>,
    {
        Message::new("PING", [token.into()])
    }

    /// Create a PONG message echoing a PING payload
    #[must_use]
    pub fn pong<S>(token: S) -> Self
    where
        S: Into<String>,
    {
        Message::new("PONG", [token.into()])
    }

    /// Set the origin prefix of this message
    #[must_use]
    pub fn with_prefix<P>(mut self, prefix: P) -> Self
    where
        P: Into<String>,
    {
        self.prefix = Some(prefix.into());
        self
    }

    /// Add a single IRCv3 tag to this message
    #[must_use]
    pub fn with_tag<K, V>(mut self, key: K, value: Option<V>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let tag = Tag(Cow::Owned(key.into()), value.map(Into::into));
        self.tags.get_or_insert_with(Vec::new).push(tag);
        self
    }
}

/// An IRCv3 message tag: key and optional value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag(pub Cow<'static, str>, pub Option<String>);

impl Tag {
    /// Create a new tag.
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Tag(Cow::Owned(key.into()), value)
    }
}
