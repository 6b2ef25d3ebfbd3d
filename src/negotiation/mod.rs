//! Negotiation pipeline.
//!
//! An ordered, fixed list of listeners that observe every inbound and
//! synthetic message before the router's subscribers do. Between them they
//! drive registration:
//!
//! 1. [`CapsListener`]: CAP negotiation
//! 2. [`ServerPassListener`]: `PASS`
//! 3. [`UserListener`]: our own nick, ident and host
//! 4. [`ChannelListener`]: channels we're in
//! 5. [`LoginListener`]: `NICK`/`USER`, nick collisions, `PING`, end of MOTD
//! 6. [`IdentifyListener`]: identity service login
//! 7. [`ModeListener`]: user mode
//! 8. [`JoinListener`]: auto-join
//! 9. [`FirstContactListener`]: one-shot hook on the first login
//!
//! Earlier listeners update the shared [`Session`](crate::link::Session) that
//! later listeners (and outbound truncation) read.

mod caps;
mod channel;
mod first;
mod identify;
mod join;
mod login;
mod mode;
mod server_pass;
mod user;

pub use caps::CapsListener;
pub use channel::ChannelListener;
pub use first::{FirstContactHook, FirstContactListener};
pub use identify::IdentifyListener;
pub use join::JoinListener;
pub use login::{LoginListener, MAX_NICK_RETRIES};
pub use mode::ModeListener;
pub use server_pass::ServerPassListener;
pub use user::UserListener;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::config::LinkConfig;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::Message;

/// Observes every message during (and after) negotiation.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Called for every message, in pipeline order.
    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError>;
}

/// The ordered listener list.
pub struct Pipeline {
    listeners: Vec<Arc<dyn Listener>>,
}

impl Pipeline {
    pub fn new(listeners: Vec<Arc<dyn Listener>>) -> Self {
        Self { listeners }
    }

    /// The standard nine listeners, with a logging first-contact hook.
    pub fn standard(config: &LinkConfig) -> Self {
        Self::standard_with_hook(config, FirstContactListener::log_hook())
    }

    /// The standard nine listeners, with `hook` run on first contact.
    pub fn standard_with_hook(config: &LinkConfig, hook: FirstContactHook) -> Self {
        Self::new(vec![
            Arc::new(CapsListener::new()),
            Arc::new(ServerPassListener::new(config.serverpass.clone())),
            Arc::new(UserListener::new(config)),
            Arc::new(ChannelListener),
            Arc::new(LoginListener::new(config)),
            Arc::new(IdentifyListener::new(config.identify.clone())),
            Arc::new(ModeListener::new(config.mode.clone())),
            Arc::new(JoinListener::new(config.channels.clone())),
            Arc::new(FirstContactListener::new(hook)),
        ])
    }

    pub fn listeners(&self) -> &[Arc<dyn Listener>] {
        &self.listeners
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Run every listener on `message`, in order.
    ///
    /// A listener returning an error is logged and skipped; the rest still run.
    pub async fn observe(&self, message: &Message, link: &LinkHandle) {
        for listener in &self.listeners {
            if let Err(e) = listener.observe(message, link).await {
                warn!(
                    listener = listener.name(),
                    command = message.command().unwrap_or("?"),
                    error = %e,
                    "listener failed"
                );
            }
        }
    }
}
