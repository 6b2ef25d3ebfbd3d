//! Registration handshake.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use slirc_wire::numeric::{ERR_ERRONEUSNICKNAME, ERR_NICKNAMEINUSE, RPL_WELCOME, ends_greeting};
use tracing::{error, info, warn};

use super::Listener;
use crate::config::LinkConfig;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::{Lifecycle, Message};

/// Nick collisions tolerated per connection before giving up on it.
pub const MAX_NICK_RETRIES: u32 = 5;

/// Drives registration: `NICK`/`USER`, collisions, `PING`, and end of MOTD.
///
/// End of MOTD (or its absence) is when we consider ourselves logged in; the
/// synthetic [`Lifecycle::Login`] is queued then.
pub struct LoginListener {
    nickname: String,
    username: String,
    realname: String,
    nick_retries: AtomicU32,
}

impl LoginListener {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            nickname: config.nickname.clone(),
            username: config.username.clone(),
            realname: config.realname.clone(),
            nick_retries: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Listener for LoginListener {
    fn name(&self) -> &'static str {
        "login"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        if message.is(Lifecycle::Connection) {
            self.nick_retries.store(0, Ordering::Relaxed);
            link.send_raw(format!("NICK {}", self.nickname)).await?;
            link.send_raw(format!("USER {} 0 * :{}", self.username, self.realname))
                .await?;
            return Ok(());
        }
        let Some(line) = message.line() else {
            return Ok(());
        };

        if line.is("PING") {
            let token = line.trailing().unwrap_or_default();
            link.send_raw(format!("PONG :{token}")).await?;
            return Ok(());
        }

        match line.numeric() {
            Some(RPL_WELCOME) => {
                link.update_session(|s| s.registered = true);
            }
            Some(ERR_NICKNAMEINUSE) if !link.with_session(|s| s.registered) => {
                let retries = self.nick_retries.fetch_add(1, Ordering::Relaxed) + 1;
                if retries > MAX_NICK_RETRIES {
                    error!(retries, "no free nickname, dropping connection");
                    link.stop(false).await;
                    return Ok(());
                }
                // <me> <nick> :Nickname is already in use
                let taken = line
                    .param(1)
                    .map(str::to_owned)
                    .unwrap_or_else(|| link.user().nick);
                let next = format!("{taken}_");
                warn!(taken = %taken, next = %next, "nickname in use");
                let nick = next.clone();
                link.update_session(|s| s.user.nick = nick);
                link.send_raw(format!("NICK {next}")).await?;
            }
            Some(ERR_ERRONEUSNICKNAME) => {
                error!(nick = ?line.param(1), "nickname rejected by server");
            }
            Some(code) if ends_greeting(code) => {
                let first = link.update_session(|s| !std::mem::replace(&mut s.logged_in, true));
                if first {
                    info!(nick = %link.user().nick, "logged in");
                    link.logical_success();
                    link.queue_synthetic(Lifecycle::Login);
                }
            }
            _ => {}
        }
        Ok(())
    }
}
