//! Line decoding.
//!
//! [`Message::decode`] turns one wire line into an owned [`Message`]. Lines
//! longer than the 512-byte limit are cut down and flagged rather than
//! rejected; callers decide whether the truncation matters.

use std::borrow::Cow;

use crate::error::{MessageParseError, ProtocolError, Result};

use super::nom_parser::ParsedMessage;
use super::tags::unescape_tag_value;
use super::types::{Message, Tag};
use super::{MAX_LINE_LEN, MAX_TAGS_LEN};

/// Result of decoding one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    /// The parsed message.
    pub message: Message,
    /// The line exceeded [`MAX_LINE_LEN`] and was cut before parsing.
    pub truncated: bool,
}

#[inline]
fn intern_tag_key(key: &str) -> Cow<'static, str> {
    match key {
        "msgid" => Cow::Borrowed("msgid"),
        "time" => Cow::Borrowed("time"),
        "account" => Cow::Borrowed("account"),
        "label" => Cow::Borrowed("label"),
        "bot" => Cow::Borrowed("bot"),
        "draft/bot" => Cow::Borrowed("draft/bot"),
        _ => Cow::Owned(key.to_owned()),
    }
}

/// Parse a raw tags string (without the leading `@`).
fn parse_tags_string(tags_str: &str) -> Vec<Tag> {
    tags_str
        .split(';')
        .filter(|s| !s.is_empty())
        .map(|tag| match tag.split_once('=') {
            Some((key, value)) => Tag(intern_tag_key(key), Some(unescape_tag_value(value))),
            None => Tag(intern_tag_key(tag), None),
        })
        .collect()
}

/// Largest index `<= max` that sits on a char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn invalid(line: &str, cause: MessageParseError) -> ProtocolError {
    ProtocolError::InvalidMessage {
        string: line.to_owned(),
        cause,
    }
}

impl Message {
    /// Decode one line, with or without its trailing CR/LF.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidMessage`] for empty lines, embedded
    /// NUL/CR/LF, or a missing or malformed command, and
    /// [`ProtocolError::TagsTooLong`] when the tag section is over
    /// [`MAX_TAGS_LEN`].
    pub fn decode(raw: &str) -> Result<Decoded> {
        let line = raw.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(invalid(raw, MessageParseError::EmptyMessage));
        }

        if let Some(position) = line.bytes().position(|b| matches!(b, b'\0' | b'\r' | b'\n')) {
            return Err(invalid(
                line,
                MessageParseError::InvalidCharacterAt {
                    byte: line.as_bytes()[position],
                    position,
                },
            ));
        }

        // The length limit applies to everything after the tag section.
        let body_start = if line.starts_with('@') {
            let tags_end = line
                .find(' ')
                .ok_or_else(|| invalid(line, MessageParseError::UnterminatedTags))?;
            if tags_end + 1 > MAX_TAGS_LEN {
                return Err(ProtocolError::TagsTooLong {
                    actual: tags_end + 1,
                    limit: MAX_TAGS_LEN,
                });
            }
            tags_end + 1
        } else {
            0
        };

        let body_limit = MAX_LINE_LEN - 2;
        let body = &line[body_start..];
        let (text, truncated) = if body.len() > body_limit {
            let cut = body_start + floor_char_boundary(body, body_limit);
            (&line[..cut], true)
        } else {
            (line, false)
        };

        let parsed = ParsedMessage::parse(text).map_err(|e| {
            invalid(
                line,
                MessageParseError::ParseContext {
                    position: e.position,
                    context: e.describe().to_string(),
                },
            )
        })?;

        let message = Message {
            tags: parsed
                .tags
                .map(parse_tags_string)
                .filter(|tags| !tags.is_empty()),
            prefix: parsed.prefix.map(str::to_owned),
            command: parsed.command.to_owned(),
            params: parsed.params.iter().map(|p| (*p).to_owned()).collect(),
        };

        Ok(Decoded { message, truncated })
    }
}
