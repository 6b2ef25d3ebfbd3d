//! Default value functions for configuration.

use slirc_wire::encoding::DEFAULT_FALLBACK;

// =============================================================================
// Identity Defaults
// =============================================================================

pub fn default_username() -> String {
    "bot".to_string()
}

pub fn default_nickname() -> String {
    "bot".to_string()
}

pub fn default_realname() -> String {
    "Bot".to_string()
}

pub fn default_identify_service() -> String {
    "NickServ".to_string()
}

// =============================================================================
// Connection Defaults
// =============================================================================

pub fn default_reconnect_delay() -> u64 {
    15
}

pub fn default_fallback_encoding() -> String {
    DEFAULT_FALLBACK.to_string()
}

pub fn default_servers() -> Vec<String> {
    vec!["localhost:6667".to_string()]
}
