//! Core configuration types.

use super::defaults::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Connection engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    /// Connector identifier, resolved against `connectors`.
    pub connector: String,
    /// Ident sent in `USER`.
    #[serde(default = "default_username")]
    pub username: String,
    /// Nickname to register with.
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// Real name sent in `USER`.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Server password (`PASS`).
    #[serde(default)]
    pub serverpass: Option<String>,
    /// Channels to join once logged in.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Identity service credentials.
    #[serde(default)]
    pub identify: Option<IdentifyConfig>,
    /// User mode string applied once logged in (e.g. `+i`).
    #[serde(default)]
    pub mode: Option<String>,
    /// Seconds to wait between connection attempts.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
    /// Throttle burst size (0 = unlimited).
    #[serde(default)]
    pub burst: u32,
    /// Throttle rate in messages per second (0 = unlimited).
    #[serde(default)]
    pub rate: f64,
    /// Legacy code page label for inbound lines that aren't UTF-8.
    #[serde(default = "default_fallback_encoding")]
    pub fallback_encoding: String,
    /// Free-form context attached to the worker's log span.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Known connectors by id.
    #[serde(default)]
    pub connectors: BTreeMap<String, ConnectorConfig>,
}

/// Credentials for the identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyConfig {
    /// Service nickname.
    #[serde(default = "default_identify_service")]
    pub service: String,
    pub password: String,
    /// Account name, when it differs from the nickname.
    #[serde(default)]
    pub account: Option<String>,
}

/// Where and how a connector connects.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// `host:port` entries, tried in order.
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
    #[serde(default)]
    pub tls: bool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            tls: false,
        }
    }
}

impl LinkConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Configuration with every option at its default.
    pub fn new(connector: impl Into<String>) -> Self {
        Self {
            connector: connector.into(),
            username: default_username(),
            nickname: default_nickname(),
            realname: default_realname(),
            serverpass: None,
            channels: Vec::new(),
            identify: None,
            mode: None,
            reconnect_delay: default_reconnect_delay(),
            burst: 0,
            rate: 0.0,
            fallback_encoding: default_fallback_encoding(),
            metadata: BTreeMap::new(),
            connectors: BTreeMap::new(),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay)
    }

    /// The `[connectors.<id>]` entry for `connector`.
    pub fn connector_config(&self) -> Option<&ConnectorConfig> {
        self.connectors.get(&self.connector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config = LinkConfig::from_toml(r#"connector = "libera""#).unwrap();
        assert_eq!(config.connector, "libera");
        assert_eq!(config.nickname, "bot");
        assert_eq!(config.username, "bot");
        assert_eq!(config.realname, "Bot");
        assert_eq!(config.reconnect_delay(), Duration::from_secs(15));
        assert_eq!(config.burst, 0);
        assert_eq!(config.rate, 0.0);
        assert_eq!(config.fallback_encoding, "windows-1252");
        assert!(config.connector_config().is_none());
    }

    #[test]
    fn test_full_config() {
        let config = LinkConfig::from_toml(
            r##"
            connector = "libera"
            nickname = "slirc"
            channels = ["#rust", "#tokio"]
            mode = "+i"
            burst = 5
            rate = 0.5

            [identify]
            password = "hunter2"

            [metadata]
            instance = "prod-1"

            [connectors.libera]
            servers = ["irc.libera.chat:6697"]
            tls = true
            "##,
        )
        .unwrap();

        assert_eq!(config.channels, vec!["#rust", "#tokio"]);
        let identify = config.identify.as_ref().unwrap();
        assert_eq!(identify.service, "NickServ");
        assert!(identify.account.is_none());
        assert_eq!(config.metadata["instance"], "prod-1");
        let connector = config.connector_config().unwrap();
        assert!(connector.tls);
        assert_eq!(connector.servers, vec!["irc.libera.chat:6697"]);
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connector = \"local\"\nreconnect_delay = 3").unwrap();

        let config = LinkConfig::load(file.path()).unwrap();
        assert_eq!(config.connector, "local");
        assert_eq!(config.reconnect_delay(), Duration::from_secs(3));

        assert!(matches!(
            LinkConfig::load(file.path().with_extension("missing")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_missing_connector_is_error() {
        assert!(matches!(
            LinkConfig::from_toml(r#"nickname = "x""#),
            Err(ConfigError::Parse(_))
        ));
    }
}
