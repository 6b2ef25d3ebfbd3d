//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (LinkConfig, IdentifyConfig, ConnectorConfig)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks

mod defaults;
mod types;
mod validation;

pub use types::{ConfigError, ConnectorConfig, IdentifyConfig, LinkConfig};
pub use validation::{validate, validate_connector, ValidationError};
