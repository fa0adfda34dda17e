//! Nom-based IRC line parser.
//!
//! Splits a single line (CR/LF already removed) into borrowed tag, prefix,
//! command and parameter slices. Ownership and validation of the pieces is
//! left to [`super::parse`].

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

/// RFC 2812 parameter limit.
pub(crate) const MAX_PARAMS: usize = 15;

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// command = 1*letter / 3digit, followed by a space or end of line.
fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_ascii_alphanumeric())(input)?;

    let is_all_letters = cmd.bytes().all(|b| b.is_ascii_alphabetic());
    let is_three_digits = cmd.len() == 3 && cmd.bytes().all(|b| b.is_ascii_digit());
    let terminated = rest.is_empty() || rest.starts_with(' ');

    if (is_all_letters || is_three_digits) && terminated {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            ErrorKind::AlphaNumeric,
        )))
    }
}

/// Split the parameter section. Runs of spaces count as one separator and
/// a `:` starts the trailing parameter. After fourteen middle parameters
/// the fifteenth takes the rest of the line, spaces included (RFC 2812
/// section 2.3.1), so nothing past the limit is lost.
fn parse_params(input: &str) -> (&str, SmallVec<[&str; MAX_PARAMS]>) {
    let mut params: SmallVec<[&str; MAX_PARAMS]> = SmallVec::new();
    let mut rest = input;

    while rest.starts_with(' ') {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }

        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing);
            rest = "";
            break;
        }
        if params.len() == MAX_PARAMS - 1 {
            params.push(rest);
            rest = "";
            break;
        }

        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(&rest[..end]);
        rest = &rest[end..];
    }

    (rest, params)
}

fn parse_message(input: &str) -> IResult<&str, ParsedMessage<'_>> {
    let (input, tags) = opt(parse_tags)(input)?;
    let (input, _) = space0(input)?;

    let (input, prefix) = opt(parse_prefix)(input)?;
    let (input, _) = space0(input)?;

    let (input, command) = parse_command(input)?;
    let (rest, params) = parse_params(input);

    Ok((
        rest,
        ParsedMessage {
            tags,
            prefix,
            command,
            params,
        },
    ))
}

/// A parsed IRC line with borrowed slices into the input.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedMessage<'a> {
    /// Raw tags string (without the leading `@`), if present.
    pub tags: Option<&'a str>,
    /// Raw prefix string (without the leading `:`), if present.
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; MAX_PARAMS]>,
}

impl<'a> ParsedMessage<'a> {
    pub fn parse(input: &'a str) -> Result<Self, DetailedParseError> {
        match parse_message(input) {
            Ok((_rest, msg)) => Ok(msg),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(DetailedParseError {
                position: input.len() - e.input.len(),
                kind: e.code,
            }),
            Err(nom::Err::Incomplete(_)) => Err(DetailedParseError {
                position: input.len(),
                kind: ErrorKind::Eof,
            }),
        }
    }
}

/// Where and why the nom parser gave up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DetailedParseError {
    pub position: usize,
    pub kind: ErrorKind,
}

impl DetailedParseError {
    pub fn describe(&self) -> &'static str {
        match self.kind {
            ErrorKind::TakeUntil => "tags without a following command",
            ErrorKind::TakeWhile1 => "missing prefix or command",
            ErrorKind::AlphaNumeric => "command must be letters or a three-digit numeric",
            _ => "malformed line",
        }
    }
}
