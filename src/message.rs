//! Messages handed to the negotiation pipeline and the router.

use chrono::{DateTime, Utc};
use slirc_wire::Line;

/// Lifecycle transitions delivered through the dispatch path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// A transport was opened; nothing has been read yet.
    Connection,
    /// The transport is gone.
    Disconnection,
    /// Registration finished (end of MOTD).
    Login,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Disconnection => "disconnection",
            Self::Login => "login",
        }
    }
}

/// One line as received, after encoding normalization.
#[derive(Debug, Clone)]
pub struct Inbound {
    /// Decoded line without its terminator.
    pub raw: String,
    /// Parsed form, `None` if the line didn't parse.
    pub line: Option<Line>,
    pub received_at: DateTime<Utc>,
}

/// A unit of dispatch.
#[derive(Debug, Clone)]
pub enum Message {
    Inbound(Inbound),
    /// Lifecycle event with no wire representation.
    Synthetic(Lifecycle),
}

impl Message {
    /// Wrap a decoded line, parsing it on the way.
    pub fn inbound(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let line = match Line::parse(&raw) {
            Ok(line) => Some(line),
            Err(e) => {
                tracing::debug!(error = %e, "unparseable line");
                None
            }
        };
        Self::Inbound(Inbound {
            raw,
            line,
            received_at: Utc::now(),
        })
    }

    /// Parsed line, for inbound messages that parsed.
    pub fn line(&self) -> Option<&Line> {
        match self {
            Self::Inbound(inbound) => inbound.line.as_ref(),
            Self::Synthetic(_) => None,
        }
    }

    pub fn lifecycle(&self) -> Option<Lifecycle> {
        match self {
            Self::Synthetic(event) => Some(*event),
            Self::Inbound(_) => None,
        }
    }

    /// Whether this is the synthetic `event`.
    pub fn is(&self, event: Lifecycle) -> bool {
        self.lifecycle() == Some(event)
    }

    /// Command name: the parsed command, or the lifecycle event name.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Inbound(inbound) => inbound.line.as_ref().map(|l| l.command.as_str()),
            Self::Synthetic(event) => Some(event.as_str()),
        }
    }

    pub fn numeric(&self) -> Option<u16> {
        self.line().and_then(Line::numeric)
    }
}

impl From<Lifecycle> for Message {
    fn from(event: Lifecycle) -> Self {
        Self::Synthetic(event)
    }
}
