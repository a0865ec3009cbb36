//! Configuration module
//!
//! Provider credentials, endpoint overrides, extra priced models and
//! connection settings, loaded from YAML or JSON with `${VAR}` interpolation.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::interpolate_env_vars;
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    ConnectionConfig, DomchatConfig, ModelEntry, ProviderConfig, CONFIG_VERSION,
};
pub use secrets::{redact_header, redact_url, SafeLogging, SecretString};
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<DomchatConfig> {
    let path = path.as_ref();
    let content = read_config(path)?;
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: DomchatConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    finish_loading(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<DomchatConfig> {
    let path = path.as_ref();
    let content = read_config(path)?;
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: DomchatConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    finish_loading(config)
}

fn read_config(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn finish_loading(mut config: DomchatConfig) -> ConfigResult<DomchatConfig> {
    env::interpolate_config_env_vars(&mut config)?;
    ConfigValidator::new().validate(&config)?;
    tracing::debug!(
        "Loaded configuration with {} provider(s)",
        config.providers.len()
    );
    Ok(config)
}
