//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "STOREFRONT_GUARD_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GuardConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `path` if given, otherwise start from defaults.
///
/// Environment overrides apply in both cases.
pub fn load_or_default(path: Option<&Path>) -> Result<GuardConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = GuardConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Overlay secrets and the bind address from the environment.
pub fn apply_env_overrides<F>(config: &mut GuardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("STOREFRONT_GUARD_BIND_ADDR") {
        config.listener.bind_address = addr;
    }
    if let Some(password) = lookup("STOREFRONT_GUARD_ADMIN_PASSWORD") {
        config.admin.password = password;
    }
    if let Some(key) = lookup("STOREFRONT_GUARD_ADMIN_API_KEY") {
        config.admin.api_key = key;
    }
}
