//! Connection lifecycle state and per-connection session data.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Where the supervised loop is.
///
/// `Idle → Connecting → Active → Closing → Connecting → … → Terminated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// Not started.
    Idle,
    /// Opening a transport.
    Connecting,
    /// Transport open, read loop running.
    Active,
    /// Transport gone, waiting out the reconnect delay.
    Closing,
    /// Stopped for good.
    Terminated,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Closing => "closing",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Our own identity as the server sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IrcUser {
    pub nick: String,
    pub username: String,
    pub realname: String,
    /// Unknown until the server tells us.
    pub host: Option<String>,
}

impl IrcUser {
    /// `nick!user@host`, as prefixed to lines the server relays for us.
    pub fn host_mask(&self) -> String {
        format!(
            "{}!{}@{}",
            self.nick,
            self.username,
            self.host.as_deref().unwrap_or_default()
        )
    }
}

/// State negotiated over the current connection.
///
/// Reset by the listeners on each new connection.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: IrcUser,
    /// Capabilities the server offered.
    pub advertised_caps: HashSet<String>,
    /// Capabilities the server acknowledged.
    pub caps: HashSet<String>,
    /// Channels we're in.
    pub channels: BTreeSet<String>,
    /// `001` seen.
    pub registered: bool,
    /// End of MOTD seen.
    pub logged_in: bool,
    /// Services account, once identified.
    pub account: Option<String>,
}

impl Session {
    pub fn has_cap(&self, cap: &str) -> bool {
        self.caps.contains(cap)
    }
}
