//! Message source (prefix) parsing.
//!
//! The source of an inbound line is either a server name or a
//! `nick!user@host` mask. Parsing is lenient: missing parts come back empty.

use std::fmt;

/// Origin of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// Server name (e.g. `irc.example.com`).
    Server(String),
    /// User mask split into nick, user and host.
    User {
        /// Nickname.
        nick: String,
        /// Username (ident), possibly empty.
        user: String,
        /// Hostname, possibly empty.
        host: String,
    },
}

impl Prefix {
    /// Parse a prefix without its leading `:`.
    ///
    /// A bare name containing a dot and neither `!` nor `@` is a server name.
    ///
    /// ```
    /// use slirc_wire::Prefix;
    ///
    /// let prefix = Prefix::parse("bot!~user@host.example");
    /// assert_eq!(prefix.nick(), Some("bot"));
    /// assert_eq!(prefix.user(), Some("~user"));
    /// assert_eq!(prefix.host(), Some("host.example"));
    ///
    /// assert_eq!(Prefix::parse("irc.example.net"), Prefix::Server("irc.example.net".into()));
    /// ```
    pub fn parse(s: &str) -> Self {
        let (name_user, host) = match s.split_once('@') {
            Some((left, host)) => (left, Some(host)),
            None => (s, None),
        };
        let (name, user) = match name_user.split_once('!') {
            Some((name, user)) => (name, Some(user)),
            None => (name_user, None),
        };

        if user.is_none() && host.is_none() && name.contains('.') {
            return Prefix::Server(name.to_owned());
        }

        Prefix::User {
            nick: name.to_owned(),
            user: user.unwrap_or_default().to_owned(),
            host: host.unwrap_or_default().to_owned(),
        }
    }

    /// Nickname, for user prefixes.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::User { nick, .. } if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Username, for user prefixes that carry one.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::User { user, .. } if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// Hostname, for user prefixes that carry one.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::User { host, .. } if !host.is_empty() => Some(host),
            _ => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => f.write_str(name),
            Prefix::User { nick, user, host } => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}
