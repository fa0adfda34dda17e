//! IRC message types, decoding and encoding.

mod nom_parser;
mod parse;
mod serialize;
/// IRCv3 tag utilities.
pub mod tags;
mod types;

pub use self::parse::Decoded;
pub use self::types::{Message, Tag};

/// Maximum length of a line after the tag section, CR/LF included.
pub const MAX_LINE_LEN: usize = 512;

/// Maximum length of the tag section, leading `@` and trailing space included.
pub const MAX_TAGS_LEN: usize = 8191;
