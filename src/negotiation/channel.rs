//! Channel membership bookkeeping.

use async_trait::async_trait;

use super::Listener;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::{Lifecycle, Message};

/// Tracks the channels we're in from our own `JOIN`, `PART` and `KICK`.
pub struct ChannelListener;

#[async_trait]
impl Listener for ChannelListener {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        if message.is(Lifecycle::Connection) || message.is(Lifecycle::Disconnection) {
            // New transport or lost transport: either way we're in nothing.
            link.update_session(|s| s.channels.clear());
            return Ok(());
        }
        let Some(line) = message.line() else {
            return Ok(());
        };

        link.update_session(|s| {
            let me = s.user.nick.as_str();
            match line.command.as_str() {
                "JOIN" if line.is_from(me) => {
                    if let Some(list) = line.param(0) {
                        s.channels.extend(list.split(',').map(str::to_owned));
                    }
                }
                "PART" if line.is_from(me) => {
                    if let Some(list) = line.param(0) {
                        for channel in list.split(',') {
                            s.channels.remove(channel);
                        }
                    }
                }
                "KICK" if line.param(1).is_some_and(|nick| nick.eq_ignore_ascii_case(me)) => {
                    if let Some(channel) = line.param(0) {
                        s.channels.remove(channel);
                    }
                }
                _ => {}
            }
        });
        Ok(())
    }
}
