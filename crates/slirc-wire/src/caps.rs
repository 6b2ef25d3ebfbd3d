//! Client-side CAP negotiation helpers.
//!
//! Only the parsing side lives here. Deciding what to request is the
//! negotiation listener's job.

use std::collections::HashSet;

use crate::line::Line;

/// Server prepends `+`/`-` to relayed messages (identified sender or not).
pub const IDENTIFY_MSG: &str = "identify-msg";

/// Prefix channel-user lists with every status mode, not just the highest.
pub const MULTI_PREFIX: &str = "multi-prefix";

/// A server `CAP` reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapReply {
    /// Advertised capabilities; `more` is set on all but the last LS line.
    Ls {
        /// Capability names (values stripped).
        caps: Vec<String>,
        /// Another LS line follows.
        more: bool,
    },
    /// Requested capabilities the server enabled (or disabled, with `-`).
    Ack(Vec<String>),
    /// Rejected request.
    Nak(Vec<String>),
    /// Capabilities that became available.
    New(Vec<String>),
    /// Capabilities that went away.
    Del(Vec<String>),
}

impl CapReply {
    /// Interpret `line` as a CAP reply.
    ///
    /// Returns `None` for anything that isn't a server `CAP` line we know.
    pub fn parse(line: &Line) -> Option<Self> {
        if !line.is("CAP") {
            return None;
        }
        let subcommand = line.param(1)?.to_ascii_uppercase();
        let more = line.params.len() > 3 && line.param(2) == Some("*");
        let list = names(line.trailing().filter(|_| line.params.len() > 2)?);

        Some(match subcommand.as_str() {
            "LS" => CapReply::Ls { caps: list, more },
            "ACK" => CapReply::Ack(list),
            "NAK" => CapReply::Nak(list),
            "NEW" => CapReply::New(list),
            "DEL" => CapReply::Del(list),
            _ => return None,
        })
    }
}

/// Capability names in a space-separated list, `=value` suffixes stripped.
pub fn names(list: &str) -> Vec<String> {
    list.split_whitespace()
        .map(|cap| cap.split('=').next().unwrap_or(cap).to_owned())
        .collect()
}

/// Apply ACK-style changes to an active set.
///
/// Entries prefixed with `-` are removed, all others added. Returns true if
/// the set changed.
pub fn apply_changes(enabled: &mut HashSet<String>, changes: &[String]) -> bool {
    let mut modified = false;
    for change in changes {
        modified |= match change.strip_prefix('-') {
            Some(name) => enabled.remove(name),
            None => enabled.insert(change.clone()),
        };
    }
    modified
}
