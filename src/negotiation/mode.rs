//! User mode.

use async_trait::async_trait;

use super::Listener;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::{Lifecycle, Message};

/// Applies the configured user mode once logged in.
pub struct ModeListener {
    mode: Option<String>,
}

impl ModeListener {
    pub fn new(mode: Option<String>) -> Self {
        Self { mode }
    }
}

#[async_trait]
impl Listener for ModeListener {
    fn name(&self) -> &'static str {
        "mode"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        if !message.is(Lifecycle::Login) {
            return Ok(());
        }
        if let Some(mode) = self.mode.as_deref().filter(|m| !m.is_empty()) {
            let nick = link.user().nick;
            link.send_raw(format!("MODE {nick} {mode}")).await?;
        }
        Ok(())
    }
}
