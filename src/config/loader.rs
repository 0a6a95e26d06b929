//! Configuration loading from the environment.

use std::path::Path;

use crate::config::schema::{ApiConfig, AppConfig, Settings};
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("invalid {prefix}* variable: {source}")]
    Env {
        prefix: &'static str,
        #[source]
        source: envy::Error,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load settings from the process environment, reading `.env` first when present.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_with_env_file(Path::new(".env"))
}

/// Load settings, reading the given env file first when it exists.
///
/// Variables already present in the process environment win over the file.
pub fn load_settings_with_env_file(path: &Path) -> Result<Settings, ConfigError> {
    if path.exists() {
        dotenvy::from_path(path)?;
    }
    settings_from_vars(std::env::vars())
}

/// Build and validate settings from an explicit set of variables.
///
/// Variable names are matched case-insensitively.
pub fn settings_from_vars<I>(vars: I) -> Result<Settings, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: Vec<(String, String)> = vars
        .into_iter()
        .map(|(key, value)| (key.to_ascii_uppercase(), value))
        .collect();

    let app: AppConfig = envy::prefixed("APP_")
        .from_iter(vars.iter().cloned())
        .map_err(|source| ConfigError::Env { prefix: "APP_", source })?;
    let api: ApiConfig = envy::prefixed("API_")
        .from_iter(vars)
        .map_err(|source| ConfigError::Env { prefix: "API_", source })?;

    let settings = Settings { app, api };
    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}
