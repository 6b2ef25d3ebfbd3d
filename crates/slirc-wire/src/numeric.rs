//! Numeric replies a client cares about during registration.
//!
//! # Reference
//! - RFC 2812 Section 5: Replies
//! - IRCv3 SASL 3.1 (`RPL_LOGGEDIN`)

/// Registration complete; first parameter is our nickname.
pub const RPL_WELCOME: u16 = 1;
/// WHOIS user line: `<me> <nick> <user> <host> * :<realname>`.
pub const RPL_WHOISUSER: u16 = 311;
/// End of MOTD; the server is done greeting us.
pub const RPL_ENDOFMOTD: u16 = 376;
/// Our displayed host changed: `<me> <host> :is now your displayed host`.
pub const RPL_HOSTHIDDEN: u16 = 396;
/// No MOTD; counts as the end of the greeting.
pub const ERR_NOMOTD: u16 = 422;
/// Nickname rejected as malformed.
pub const ERR_ERRONEUSNICKNAME: u16 = 432;
/// Nickname already taken.
pub const ERR_NICKNAMEINUSE: u16 = 433;
/// Logged in to an account: `<me> <mask> <account> :You are now logged in`.
pub const RPL_LOGGEDIN: u16 = 900;

/// Whether `code` ends the server's greeting.
pub fn ends_greeting(code: u16) -> bool {
    matches!(code, RPL_ENDOFMOTD | ERR_NOMOTD)
}
