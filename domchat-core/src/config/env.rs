//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::schema::DomchatConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env placeholder pattern is valid")
});

/// Pattern matching `${VAR_NAME}` placeholders
pub(crate) fn env_var_pattern() -> &'static Regex {
    &ENV_VAR_PATTERN
}

/// Interpolate environment variables in a configuration string
///
/// Fails on the first placeholder whose variable is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &regex::Captures<'_>| {
        match env::var(&cap[1]) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| cap[1].to_string());
                cap[0].to_string()
            }
        }
    });

    match missing {
        Some(var) => Err(ConfigError::EnvVarNotFound { var }),
        None => Ok(result.into_owned()),
    }
}

/// Interpolate the credential and endpoint fields of a loaded config
///
/// Covers values that reached the struct without passing through the text
/// pass, e.g. configs built in code.
pub fn interpolate_config_env_vars(config: &mut DomchatConfig) -> Result<(), ConfigError> {
    for provider in &mut config.providers {
        if let Some(api_key) = &provider.api_key {
            if ENV_VAR_PATTERN.is_match(api_key.expose_secret()) {
                let interpolated = interpolate_env_vars(api_key.expose_secret())?;
                provider.api_key = Some(SecretString::new(interpolated));
            }
        }

        if let Some(base_url) = &provider.base_url {
            if ENV_VAR_PATTERN.is_match(base_url) {
                provider.base_url = Some(interpolate_env_vars(base_url)?);
            }
        }
    }

    Ok(())
}
