//! Error types for the wire helpers.

use thiserror::Error;

/// Convenience type alias for line parsing results.
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Truncation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TruncateError {
    /// A request marked must-not-truncate would have lost characters.
    #[error("can't truncate: {kept_chars} of {original_chars} characters fit")]
    WouldTruncate {
        /// Character count of the normalized text.
        original_chars: usize,
        /// Character count that fits the byte limit.
        kept_chars: usize,
    },
}

/// Inbound line parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Nothing left after stripping line terminators.
    #[error("empty line")]
    Empty,

    /// A tags or prefix section was not followed by a command.
    #[error("missing command in line: {0}")]
    MissingCommand(String),

    /// The command token contains characters outside `[A-Za-z0-9]`.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
