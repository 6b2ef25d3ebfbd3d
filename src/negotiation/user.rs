//! Our own identity.

use async_trait::async_trait;
use slirc_wire::numeric::{RPL_HOSTHIDDEN, RPL_WELCOME, RPL_WHOISUSER};
use slirc_wire::{Line, Prefix};

use super::Listener;
use crate::config::LinkConfig;
use crate::error::ListenerError;
use crate::link::{IrcUser, LinkHandle, Session};
use crate::message::{Lifecycle, Message};

/// Keeps the session's [`IrcUser`] in line with what the server knows.
///
/// The hostmask feeds the outbound truncation budget, so once logged in we
/// ask for our own `WHOIS` rather than wait to see ourselves echoed.
pub struct UserListener {
    initial: IrcUser,
}

impl UserListener {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            initial: IrcUser {
                nick: config.nickname.clone(),
                username: config.username.clone(),
                realname: config.realname.clone(),
                host: None,
            },
        }
    }

    fn track(session: &mut Session, line: &Line) {
        let user = &mut session.user;

        if let Some(Prefix::User { nick, user: ident, host }) = &line.prefix {
            if nick.eq_ignore_ascii_case(&user.nick) {
                if !ident.is_empty() {
                    user.username = ident.to_owned();
                }
                if !host.is_empty() {
                    user.host = Some(host.clone());
                }
                if line.is("NICK") {
                    if let Some(new_nick) = line.param(0) {
                        user.nick = new_nick.to_owned();
                    }
                }
            }
        }

        match line.numeric() {
            Some(RPL_WELCOME) => {
                if let Some(nick) = line.param(0) {
                    user.nick = nick.to_owned();
                }
            }
            // <me> <nick> <user> <host> * :<realname>
            Some(RPL_WHOISUSER) if line.param(1).is_some_and(|n| n.eq_ignore_ascii_case(&user.nick)) => {
                if let (Some(ident), Some(host)) = (line.param(2), line.param(3)) {
                    user.username = ident.to_owned();
                    user.host = Some(host.to_owned());
                }
            }
            // <me> <host> :is now your displayed host
            Some(RPL_HOSTHIDDEN) => {
                if let Some(host) = line.param(1) {
                    user.host = Some(host.to_owned());
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl Listener for UserListener {
    fn name(&self) -> &'static str {
        "user"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        match message {
            Message::Synthetic(Lifecycle::Connection) => {
                link.update_session(|s| {
                    s.user = self.initial.clone();
                    s.registered = false;
                    s.logged_in = false;
                    s.account = None;
                });
            }
            Message::Synthetic(Lifecycle::Login) => {
                let nick = link.user().nick;
                link.send_raw(format!("WHOIS {nick}")).await?;
            }
            Message::Synthetic(Lifecycle::Disconnection) => {}
            Message::Inbound(_) => {
                if let Some(line) = message.line() {
                    link.update_session(|s| Self::track(s, line));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let mut session = Session::default();
        session.user = UserListener::new(&LinkConfig::new("local")).initial;
        session
    }

    fn feed(session: &mut Session, raw: &str) {
        UserListener::track(session, &Line::parse(raw).unwrap());
    }

    #[test]
    fn test_welcome_sets_nick() {
        let mut s = session();
        feed(&mut s, ":srv 001 bot_ :Welcome");
        assert_eq!(s.user.nick, "bot_");
    }

    #[test]
    fn test_self_prefix_sets_host() {
        let mut s = session();
        feed(&mut s, ":bot!~user@host JOIN #rust");
        // The relayed prefix keeps the ident marker.
        assert_eq!(s.user.host_mask(), "bot!~user@host");

        // Someone else's prefix is ignored.
        feed(&mut s, ":other!x@elsewhere JOIN #rust");
        assert_eq!(s.user.host.as_deref(), Some("host"));
    }

    #[test]
    fn test_self_nick_change() {
        let mut s = session();
        feed(&mut s, ":bot!user@host NICK :robot");
        assert_eq!(s.user.nick, "robot");
        feed(&mut s, ":bot!user@host NICK :again");
        assert_eq!(s.user.nick, "robot");
    }

    #[test]
    fn test_whois_and_hosthidden() {
        let mut s = session();
        feed(&mut s, ":srv 311 bot bot ident some.host * :Bot");
        assert_eq!(s.user.host_mask(), "bot!ident@some.host");
        feed(&mut s, ":srv 396 bot cloaked/bot :is now your displayed host");
        assert_eq!(s.user.host.as_deref(), Some("cloaked/bot"));
    }
}
