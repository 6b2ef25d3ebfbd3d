//! # slirc-link
//!
//! A supervised, self-healing IRC client connection engine.
//!
//! - [`link`]: the Connection Manager and its worker loop
//! - [`throttle`]: token-bucket gate in front of every outbound write
//! - [`negotiation`]: the ordered listener pipeline that drives registration
//! - [`router`]: where messages go after the pipeline
//! - [`transport`]: transport factory seam and a TCP/TLS connector
//!
//! Wire-level pieces (decoding, truncation, line parsing) live in
//! [`slirc_wire`].

pub mod config;
pub mod error;
pub mod link;
pub mod message;
pub mod negotiation;
pub mod router;
pub mod throttle;
pub mod transport;

pub use config::{ConfigError, LinkConfig};
pub use error::{DisconnectReason, LinkError, ListenerError};
pub use link::{IrcUser, LastSent, LinkHandle, LinkManager, LinkState, Session};
pub use message::{Inbound, Lifecycle, Message};
pub use negotiation::{Listener, Pipeline};
pub use router::{PipelineRouter, Router};
pub use throttle::Throttler;
pub use transport::{BoxedStream, TcpConnector, TransportFactory};

pub use slirc_wire::OutboundRequest;
