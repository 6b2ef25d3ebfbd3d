//! Unified error handling for slirc-link.
//!
//! Errors are split by where they surface:
//! - [`LinkError`]: returned to callers of `send` and friends.
//! - [`DisconnectReason`]: why a connection ended; absorbed by the worker loop
//!   and only ever logged.
//! - [`ListenerError`]: a negotiation listener gave up on a message.

use std::io;

use slirc_wire::TruncateError;
use thiserror::Error;

// ============================================================================
// Send Errors (outbound path)
// ============================================================================

/// Errors returned to senders.
#[derive(Debug, Error)]
pub enum LinkError {
    /// No transport is active.
    #[error("not connected")]
    NotConnected,

    /// The request was marked must-not-truncate and didn't fit.
    #[error(transparent)]
    Truncation(#[from] TruncateError),

    /// Writing to the transport failed.
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

impl LinkError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::Truncation(_) => "truncation",
            Self::Io(_) => "io",
        }
    }
}

// ============================================================================
// Disconnect Reasons (worker loop)
// ============================================================================

/// Why a connection attempt or an established connection ended.
///
/// Every failure in the connect/read path is folded into one of these, so the
/// worker loop has a single place to log and carry on.
#[derive(Debug, Error)]
pub enum DisconnectReason {
    /// The server closed the stream.
    #[error("connection closed by server")]
    Closed,

    /// The peer reset or aborted the connection.
    #[error("connection reset: {0}")]
    Reset(io::Error),

    /// The host couldn't be reached or refused us.
    #[error("cannot connect: {0}")]
    Unreachable(io::Error),

    /// Any other I/O failure.
    #[error("i/o error: {0}")]
    Io(io::Error),

    /// `stop` closed the connection.
    #[error("stopped")]
    Stopped,

    /// Something panicked inside the connect/read path.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl DisconnectReason {
    /// Sort an I/O error into a reason.
    pub fn classify(err: io::Error) -> Self {
        use io::ErrorKind::*;
        match err.kind() {
            ConnectionReset | ConnectionAborted | BrokenPipe => Self::Reset(err),
            ConnectionRefused | HostUnreachable | NetworkUnreachable | NetworkDown
            | AddrNotAvailable | TimedOut | NotFound => Self::Unreachable(err),
            UnexpectedEof => Self::Closed,
            _ => Self::Io(err),
        }
    }

    /// Get a static code string for log labeling.
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Reset(_) => "reset",
            Self::Unreachable(_) => "unreachable",
            Self::Io(_) => "io",
            Self::Stopped => "stopped",
            Self::Unexpected(_) => "unexpected",
        }
    }

    /// Whether the connection ended because we asked it to.
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl From<io::Error> for DisconnectReason {
    fn from(err: io::Error) -> Self {
        Self::classify(err)
    }
}

// ============================================================================
// Listener Errors (negotiation pipeline)
// ============================================================================

/// A negotiation listener failed to handle a message.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Sending a reply failed.
    #[error("send failed: {0}")]
    Send(#[from] LinkError),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}
