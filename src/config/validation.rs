//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All problems are collected rather than stopping at the first one.

use std::net::SocketAddr;

use crate::config::schema::Settings;

/// A single semantic problem with the loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check the settings, returning every problem found.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.api.host.trim().is_empty() {
        errors.push(ValidationError::new("API_HOST", "must not be empty"));
    }
    if settings.api.port == 0 {
        errors.push(ValidationError::new("API_PORT", "must be between 1 and 65535"));
    }
    if let Some(url) = &settings.api.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ValidationError::new(
                "API_URL",
                "must start with http:// or https://",
            ));
        }
    }
    if settings.app.metrics_enabled
        && settings.app.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "APP_METRICS_ADDRESS",
            format!("`{}` is not a socket address", settings.app.metrics_address),
        ));
    }
    if let Some(level) = &settings.app.log_level {
        if level.trim().is_empty() {
            errors.push(ValidationError::new("APP_LOG_LEVEL", "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut settings = Settings::default();
        settings.api.port = 0;
        settings.api.url = Some("ftp://example.com".into());
        settings.app.metrics_enabled = true;
        settings.app.metrics_address = "nowhere".into();

        let errors = validate_settings(&settings).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["API_PORT", "API_URL", "APP_METRICS_ADDRESS"]);
    }

    #[test]
    fn metrics_address_only_checked_when_enabled() {
        let mut settings = Settings::default();
        settings.app.metrics_address = "nowhere".into();
        assert!(validate_settings(&settings).is_ok());
    }
}
