//! Line encoding.
//!
//! [`Message::encode`] is the checked path used on the wire: it refuses
//! anything that would not decode back to the same message. The `Display`
//! impl renders the same layout unchecked and without CR/LF, for logs.

use std::fmt::{self, Display, Formatter, Write};

use crate::error::{MessageParseError, ProtocolError, Result};

use super::nom_parser::MAX_PARAMS;
use super::tags::escape_tag_value;
use super::types::Message;
use super::{MAX_LINE_LEN, MAX_TAGS_LEN};

fn needs_colon(param: &str) -> bool {
    param.is_empty() || param.contains(' ') || param.starts_with(':')
}

fn is_valid_command(command: &str) -> bool {
    let letters = !command.is_empty() && command.bytes().all(|b| b.is_ascii_alphabetic());
    let numeric = command.len() == 3 && command.bytes().all(|b| b.is_ascii_digit());
    letters || numeric
}

fn is_valid_tag_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| !matches!(c, ' ' | ';' | '=' | '\0' | '\r' | '\n'))
}

impl Message {
    fn write_tags(&self, f: &mut dyn Write) -> fmt::Result {
        let Some(ref tags) = self.tags else {
            return Ok(());
        };
        if tags.is_empty() {
            return Ok(());
        }
        f.write_char('@')?;
        for (i, tag) in tags.iter().enumerate() {
            if i > 0 {
                f.write_char(';')?;
            }
            f.write_str(&tag.0)?;
            if let Some(ref value) = tag.1 {
                f.write_char('=')?;
                escape_tag_value(f, value)?;
            }
        }
        f.write_char(' ')
    }

    fn write_body(&self, f: &mut dyn Write) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {}", param)?;
            }
            if needs_colon(last) {
                write!(f, " :{}", last)?;
            } else {
                write!(f, " {}", last)?;
            }
        }
        Ok(())
    }

    fn check(&self) -> Result<()> {
        let rendered = || self.to_string();
        let reject = |cause| ProtocolError::InvalidMessage {
            string: rendered(),
            cause,
        };

        if !is_valid_command(&self.command) {
            return Err(reject(MessageParseError::InvalidCommand));
        }

        if let Some(ref prefix) = self.prefix {
            if prefix.is_empty() || prefix.contains([' ', '\0', '\r', '\n']) {
                return Err(reject(MessageParseError::InvalidPrefix(prefix.clone())));
            }
        }

        if let Some(ref tags) = self.tags {
            if let Some(tag) = tags.iter().find(|tag| !is_valid_tag_key(&tag.0)) {
                return Err(reject(MessageParseError::InvalidArgument(format!(
                    "tag key {:?}",
                    tag.0
                ))));
            }
            let bad_value = tags
                .iter()
                .filter_map(|tag| tag.1.as_deref())
                .find_map(|value| value.chars().find(|c| *c == '\0'));
            if let Some(ch) = bad_value {
                return Err(ProtocolError::IllegalControlChar(ch));
            }
        }

        if self.params.len() > MAX_PARAMS {
            return Err(reject(MessageParseError::InvalidArgument(format!(
                "{} parameters (limit: {})",
                self.params.len(),
                MAX_PARAMS
            ))));
        }

        for param in &self.params {
            if let Some(ch) = param.chars().find(|c| matches!(c, '\0' | '\r' | '\n')) {
                return Err(ProtocolError::IllegalControlChar(ch));
            }
        }

        if let Some((_, middle)) = self.params.split_last() {
            if let Some(param) = middle.iter().find(|p| needs_colon(p)) {
                return Err(reject(MessageParseError::InvalidArgument(param.clone())));
            }
        }

        Ok(())
    }

    /// Encode to a CR/LF-terminated wire line.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::MessageTooLong`] when everything after the tag
    ///   section, CR/LF included, is over [`MAX_LINE_LEN`] bytes. Lines are
    ///   never truncated on the way out.
    /// - [`ProtocolError::TagsTooLong`] when the tag section is over
    ///   [`MAX_TAGS_LEN`] bytes.
    /// - [`ProtocolError::IllegalControlChar`] for NUL, CR or LF in a
    ///   parameter or a NUL in a tag value.
    /// - [`ProtocolError::InvalidMessage`] for a bad command, prefix or tag
    ///   key, more than fifteen parameters, or a middle parameter that is
    ///   empty, contains a space or starts with `:`.
    pub fn encode(&self) -> Result<String> {
        self.check()?;

        let mut tags = String::new();
        let mut body = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_tags(&mut tags);
        let _ = self.write_body(&mut body);

        if tags.len() > MAX_TAGS_LEN {
            return Err(ProtocolError::TagsTooLong {
                actual: tags.len(),
                limit: MAX_TAGS_LEN,
            });
        }
        if body.len() + 2 > MAX_LINE_LEN {
            return Err(ProtocolError::MessageTooLong {
                actual: body.len() + 2,
                limit: MAX_LINE_LEN,
            });
        }

        tags.push_str(&body);
        tags.push_str("\r\n");
        Ok(tags)
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.write_tags(f)?;
        self.write_body(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_registration_lines() {
        assert_eq!(Message::nick("bot").encode().unwrap(), "NICK bot\r\n");
        assert_eq!(
            Message::user("bot", "bot").encode().unwrap(),
            "USER bot bot 0 bot\r\n"
        );
        assert_eq!(Message::join("#test").encode().unwrap(), "JOIN #test\r\n");
    }

    #[test]
    fn test_encode_trailing_colon_rules() {
        assert_eq!(
            Message::privmsg("#general", "hi").encode().unwrap(),
            "PRIVMSG #general hi\r\n"
        );
        assert_eq!(
            Message::privmsg("#general", "hello there").encode().unwrap(),
            "PRIVMSG #general :hello there\r\n"
        );
        assert_eq!(
            Message::privmsg("#general", "").encode().unwrap(),
            "PRIVMSG #general :\r\n"
        );
        assert_eq!(
            Message::privmsg("#general", ":-)").encode().unwrap(),
            "PRIVMSG #general ::-)\r\n"
        );
    }

    #[test]
    fn test_encode_prefix_and_tags() {
        let msg = Message::privmsg("#c", "a b")
            .with_prefix("alice!u@h")
            .with_tag("bot", None::<String>)
            .with_tag("note", Some("x;y"));
        assert_eq!(
            msg.encode().unwrap(),
            "@bot;note=x\\:y :alice!u@h PRIVMSG #c :a b\r\n"
        );
    }

    #[test]
    fn test_encode_rejects_line_breaks() {
        let err = Message::privmsg("#c", "one\r\nQUIT").encode().unwrap_err();
        assert!(matches!(err, ProtocolError::IllegalControlChar('\r')));

        let err = Message::privmsg("#c", "nul\0").encode().unwrap_err();
        assert!(matches!(err, ProtocolError::IllegalControlChar('\0')));
    }

    #[test]
    fn test_encode_rejects_bad_middle_params() {
        for target in ["", "#a b", ":x"] {
            let err = Message::privmsg(target, "text").encode().unwrap_err();
            assert!(
                matches!(err, ProtocolError::InvalidMessage { .. }),
                "{target:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_encode_rejects_bad_command() {
        for command in ["", "PRIV MSG", "12", "P1NG"] {
            let err = Message::new(command, ["x"]).encode().unwrap_err();
            assert!(matches!(err, ProtocolError::InvalidMessage { .. }));
        }
    }

    #[test]
    fn test_encode_too_long_is_an_error() {
        let head = "PRIVMSG #c :";
        let fits = "z".repeat(MAX_LINE_LEN - 2 - head.len());
        assert_eq!(
            Message::privmsg("#c", fits.clone()).encode().unwrap().len(),
            MAX_LINE_LEN
        );

        let over = format!("{fits}z");
        let err = Message::privmsg("#c", over).encode().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MessageTooLong {
                actual: 513,
                limit: 512
            }
        ));
    }

    #[test]
    fn test_display_has_no_line_ending() {
        let msg = Message::pong("abc");
        assert_eq!(msg.to_string(), "PONG abc");
    }
}
