//! Server password.

use async_trait::async_trait;
use slirc_wire::OutboundRequest;

use super::Listener;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::{Lifecycle, Message};

/// Sends `PASS` as soon as a transport opens.
pub struct ServerPassListener {
    password: Option<String>,
}

impl ServerPassListener {
    pub fn new(password: Option<String>) -> Self {
        Self { password }
    }
}

#[async_trait]
impl Listener for ServerPassListener {
    fn name(&self) -> &'static str {
        "server_pass"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        if let (true, Some(password)) = (message.is(Lifecycle::Connection), &self.password) {
            let request = OutboundRequest::new(format!("PASS {password}")).log_hide("PASS ****");
            link.send_raw(request).await?;
        }
        Ok(())
    }
}
