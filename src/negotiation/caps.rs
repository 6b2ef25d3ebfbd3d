//! CAP negotiation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use slirc_wire::caps::{CapReply, IDENTIFY_MSG, MULTI_PREFIX, apply_changes};
use tracing::{debug, info};

use super::Listener;
use crate::error::ListenerError;
use crate::link::LinkHandle;
use crate::message::{Lifecycle, Message};

/// Capabilities requested when offered.
const WANTED: &[&str] = &[IDENTIFY_MSG, MULTI_PREFIX];

/// Negotiates capabilities and records what the server offered and enabled.
pub struct CapsListener {
    wanted: Vec<String>,
    /// `LS` lines collected so far.
    ls_buffer: Mutex<Vec<String>>,
    /// Between `CAP LS` and `CAP END`.
    negotiating: AtomicBool,
}

impl CapsListener {
    pub fn new() -> Self {
        Self::wanting(WANTED.iter().copied())
    }

    /// Request `caps` instead of the defaults.
    pub fn wanting<'a>(caps: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            wanted: caps.into_iter().map(str::to_owned).collect(),
            ls_buffer: Mutex::new(Vec::new()),
            negotiating: AtomicBool::new(false),
        }
    }

    async fn end(&self, link: &LinkHandle) -> Result<(), ListenerError> {
        if self.negotiating.swap(false, Ordering::Relaxed) {
            link.send_raw("CAP END").await?;
        }
        Ok(())
    }

    /// Wanted capabilities in `offered` that aren't enabled yet.
    fn to_request(&self, offered: &HashSet<String>, enabled: &HashSet<String>) -> Vec<&str> {
        self.wanted
            .iter()
            .filter(|cap| offered.contains(*cap) && !enabled.contains(*cap))
            .map(String::as_str)
            .collect()
    }
}

impl Default for CapsListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Listener for CapsListener {
    fn name(&self) -> &'static str {
        "caps"
    }

    async fn observe(&self, message: &Message, link: &LinkHandle) -> Result<(), ListenerError> {
        if message.is(Lifecycle::Connection) {
            self.ls_buffer.lock().clear();
            link.update_session(|s| {
                s.advertised_caps.clear();
                s.caps.clear();
            });
            self.negotiating.store(true, Ordering::Relaxed);
            link.send_raw("CAP LS 302").await?;
            return Ok(());
        }

        let Some(reply) = message.line().and_then(CapReply::parse) else {
            return Ok(());
        };

        match reply {
            CapReply::Ls { caps, more } => {
                let offered: HashSet<String> = {
                    let mut buffer = self.ls_buffer.lock();
                    buffer.extend(caps);
                    if more {
                        return Ok(());
                    }
                    buffer.drain(..).collect()
                };
                debug!(caps = ?offered, "server capabilities");

                let request = link.update_session(|s| {
                    s.advertised_caps = offered;
                    self.to_request(&s.advertised_caps, &s.caps).join(" ")
                });
                if !self.negotiating.load(Ordering::Relaxed) {
                    return Ok(());
                }
                if request.is_empty() {
                    self.end(link).await?;
                } else {
                    link.send_raw(format!("CAP REQ :{request}")).await?;
                }
            }
            CapReply::Ack(changes) => {
                link.update_session(|s| apply_changes(&mut s.caps, &changes));
                info!(caps = ?changes, "capabilities acknowledged");
                self.end(link).await?;
            }
            CapReply::Nak(rejected) => {
                debug!(caps = ?rejected, "capabilities rejected");
                self.end(link).await?;
            }
            CapReply::New(added) => {
                let request = link.update_session(|s| {
                    s.advertised_caps.extend(added);
                    self.to_request(&s.advertised_caps, &s.caps).join(" ")
                });
                if !request.is_empty() {
                    link.send_raw(format!("CAP REQ :{request}")).await?;
                }
            }
            CapReply::Del(removed) => {
                link.update_session(|s| {
                    for cap in &removed {
                        s.advertised_caps.remove(cap);
                        s.caps.remove(cap);
                    }
                });
            }
        }
        Ok(())
    }
}
