//! Minimal inbound line parsing.
//!
//! Splits a line into its tags section, source, command and parameters.
//! Nothing is validated beyond that; interpreting commands is up to whoever
//! receives the parsed [`Line`].

use std::str::FromStr;

use crate::error::{ParseError, Result};
use crate::prefix::Prefix;

/// A parsed inbound line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Raw IRCv3 tags section without the leading `@`.
    pub tags: Option<String>,
    /// Message source.
    pub prefix: Option<Prefix>,
    /// Command, uppercased (numerics stay as their three digits).
    pub command: String,
    /// Parameters; the trailing parameter, if any, is last.
    pub params: Vec<String>,
}

impl Line {
    /// Parse one line. Trailing CR/LF are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut rest = raw.trim_end_matches(['\r', '\n']);
        if rest.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let mut tags = None;
        if let Some(tagged) = rest.strip_prefix('@') {
            let (section, tail) = split_token(tagged);
            tags = Some(section.to_owned());
            rest = tail;
        }

        let mut prefix = None;
        rest = rest.trim_start_matches(' ');
        if let Some(sourced) = rest.strip_prefix(':') {
            let (section, tail) = split_token(sourced);
            prefix = Some(Prefix::parse(section));
            rest = tail;
        }

        let (command, mut rest) = split_token(rest.trim_start_matches(' '));
        if command.is_empty() {
            return Err(ParseError::MissingCommand(raw.trim_end().to_owned()));
        }
        if !command.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ParseError::InvalidCommand(command.to_owned()));
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_owned());
                break;
            }
            let (param, tail) = split_token(rest);
            params.push(param.to_owned());
            rest = tail;
        }

        Ok(Self {
            tags,
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Parameter `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Last parameter, if any.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Numeric reply code, for three-digit commands.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Whether the command is `command` (case-insensitive).
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// Nickname of the sender, for user-sourced lines.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Whether the line was sent by `nick`.
    pub fn is_from(&self, nick: &str) -> bool {
        self.source_nick()
            .is_some_and(|source| source.eq_ignore_ascii_case(nick))
    }
}

impl FromStr for Line {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Split at the first space; the space is dropped.
fn split_token(s: &str) -> (&str, &str) {
    match s.split_once(' ') {
        Some((token, rest)) => (token, rest),
        None => (s, ""),
    }
}
