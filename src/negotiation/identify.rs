//! Identity service login.

use async_trait::async_trait;
use slirc_wire::OutboundRequest;
use slirc_wire::numeric::RPL_LOGGEDIN;
use tracing::info;

use super::Listener;
use crate::config::IdentifyConfig;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::{Lifecycle, Message};

/// Identifies with the identity service after login and records the account.
pub struct IdentifyListener {
    identify: Option<IdentifyConfig>,
}

impl IdentifyListener {
    pub fn new(identify: Option<IdentifyConfig>) -> Self {
        Self { identify }
    }

    fn request(identify: &IdentifyConfig) -> OutboundRequest {
        let service = &identify.service;
        let password = &identify.password;
        let text = match &identify.account {
            Some(account) => format!("PRIVMSG {service} :IDENTIFY {account} {password}"),
            None => format!("PRIVMSG {service} :IDENTIFY {password}"),
        };
        OutboundRequest::new(text).log_hide(format!("PRIVMSG {service} :IDENTIFY ****"))
    }
}

#[async_trait]
impl Listener for IdentifyListener {
    fn name(&self) -> &'static str {
        "identify"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        if message.is(Lifecycle::Login) {
            if let Some(identify) = &self.identify {
                link.send(Self::request(identify)).await?;
            }
            return Ok(());
        }

        // <me> <nick!user@host> <account> :You are now logged in as <account>
        if message.numeric() == Some(RPL_LOGGEDIN) {
            if let Some(account) = message.line().and_then(|l| l.param(2)) {
                info!(account = %account, "identified");
                let account = account.to_owned();
                link.update_session(|s| s.account = Some(account));
            }
        }
        Ok(())
    }
}
