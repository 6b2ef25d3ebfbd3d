//! First-contact hook.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::info;

use super::Listener;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::{Lifecycle, Message};

/// Runs once, on the first login over the manager's lifetime.
pub type FirstContactHook = Box<dyn Fn(&LinkHandle) + Send + Sync>;

pub struct FirstContactListener {
    fired: AtomicBool,
    hook: FirstContactHook,
}

impl FirstContactListener {
    pub fn new(hook: FirstContactHook) -> Self {
        Self {
            fired: AtomicBool::new(false),
            hook,
        }
    }

    pub fn log_hook() -> FirstContactHook {
        Box::new(|link| {
            info!(nick = %link.user().nick, "first contact established");
        })
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Listener for FirstContactListener {
    fn name(&self) -> &'static str {
        "first_contact"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        if message.is(Lifecycle::Login) && !self.fired.swap(true, Ordering::Relaxed) {
            (self.hook)(link);
        }
        Ok(())
    }
}
