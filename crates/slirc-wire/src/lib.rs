//! # slirc-wire
//!
//! Wire-level helpers used by the `slirc-link` connection engine.
//!
//! ## Features
//!
//! - Inbound decoding that assumes UTF-8 and falls back to a legacy code page
//! - Byte-exact outbound truncation that never splits a character
//! - Client/server truncation budgets
//! - A minimal, lenient line parser (tags, prefix, command, params)
//! - CAP list helpers and the handful of numerics a client needs
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_wire::{truncate, OutboundRequest, SERVER_BUDGET};
//!
//! let request = OutboundRequest::new("PRIVMSG #rust :hello\r\nworld");
//! let truncated = truncate(request, SERVER_BUDGET).unwrap();
//! assert_eq!(truncated.text(), Some("PRIVMSG #rust :hello  world"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod caps;
pub mod encoding;
pub mod error;
pub mod line;
pub mod numeric;
pub mod prefix;
pub mod truncate;

pub use self::encoding::Normalizer;
pub use self::error::{ParseError, TruncateError};
pub use self::line::Line;
pub use self::prefix::Prefix;
pub use self::truncate::{
    client_budget, truncate, OutboundRequest, CRLF, SERVER_BUDGET, WIRE_CEILING,
};
