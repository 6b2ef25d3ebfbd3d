//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::LinkConfig;
use slirc_wire::Normalizer;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("connector is required")]
    MissingConnector,
    #[error("{0} must not be empty")]
    EmptyIdentity(&'static str),
    #[error("{0} must not contain spaces, got '{1}'")]
    SpaceInIdentity(&'static str, String),
    #[error("rate must be a non-negative number, got {0}")]
    InvalidRate(f64),
    #[error("channel names must start with #, &, + or !, got '{0}'")]
    InvalidChannel(String),
    #[error("unknown fallback_encoding '{0}'")]
    UnknownEncoding(String),
    #[error("no [connectors.{0}] entry")]
    UnknownConnector(String),
    #[error("connector '{0}' has no servers")]
    NoServers(String),
}

/// Validate a configuration, returning all errors found.
///
/// The connector table isn't checked here; embedders may supply their own
/// transport factory. See [`validate_connector`].
pub fn validate(config: &LinkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.connector.trim().is_empty() {
        errors.push(ValidationError::MissingConnector);
    }

    for (field, value) in [
        ("nickname", &config.nickname),
        ("username", &config.username),
    ] {
        if value.is_empty() {
            errors.push(ValidationError::EmptyIdentity(field));
        } else if value.contains(' ') {
            errors.push(ValidationError::SpaceInIdentity(field, value.clone()));
        }
    }

    if !config.rate.is_finite() || config.rate < 0.0 {
        errors.push(ValidationError::InvalidRate(config.rate));
    }

    for channel in &config.channels {
        if !channel.starts_with(['#', '&', '+', '!']) || channel.contains([' ', ',']) {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if Normalizer::for_label(&config.fallback_encoding).is_none() {
        errors.push(ValidationError::UnknownEncoding(
            config.fallback_encoding.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check that the configured connector has a usable `[connectors]` entry.
pub fn validate_connector(config: &LinkConfig) -> Result<(), ValidationError> {
    match config.connector_config() {
        None => Err(ValidationError::UnknownConnector(config.connector.clone())),
        Some(connector) if connector.servers.is_empty() => {
            Err(ValidationError::NoServers(config.connector.clone()))
        }
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate(&LinkConfig::new("local")), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = LinkConfig::new("");
        config.nickname = "two words".into();
        config.username = String::new();
        config.rate = -1.0;
        config.channels = vec!["rust".into(), "#ok".into()];
        config.fallback_encoding = "klingon".into();

        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::MissingConnector,
                ValidationError::SpaceInIdentity("nickname", "two words".into()),
                ValidationError::EmptyIdentity("username"),
                ValidationError::InvalidRate(-1.0),
                ValidationError::InvalidChannel("rust".into()),
                ValidationError::UnknownEncoding("klingon".into()),
            ]
        );
    }

    #[test]
    fn test_nan_rate_rejected() {
        let mut config = LinkConfig::new("local");
        config.rate = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_connector_entry() {
        let mut config = LinkConfig::new("local");
        assert_eq!(
            validate_connector(&config),
            Err(ValidationError::UnknownConnector("local".into()))
        );

        config
            .connectors
            .insert("local".into(), ConnectorConfig::default());
        assert_eq!(validate_connector(&config), Ok(()));

        config.connectors.insert(
            "local".into(),
            ConnectorConfig {
                servers: vec![],
                tls: false,
            },
        );
        assert_eq!(
            validate_connector(&config),
            Err(ValidationError::NoServers("local".into()))
        );
    }
}
