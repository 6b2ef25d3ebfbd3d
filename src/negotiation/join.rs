//! Channel auto-join.

use async_trait::async_trait;

use super::Listener;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::{Lifecycle, Message};

/// Joins the configured channels once logged in.
pub struct JoinListener {
    channels: Vec<String>,
}

impl JoinListener {
    pub fn new(channels: Vec<String>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl Listener for JoinListener {
    fn name(&self) -> &'static str {
        "join"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        if message.is(Lifecycle::Login) {
            link.join_channels(&self.channels).await?;
        }
        Ok(())
    }
}
