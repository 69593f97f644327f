//! Logging configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Formatter names the CLI knows how to install.
pub const LOG_FORMATS: [&str; 2] = ["json", "pretty"];

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format: `"json"` or `"pretty"`.
    #[serde(default = "default_format")]
    pub format: String,
}

impl LoggingConfig {
    /// Rejects formats other than [`LOG_FORMATS`].
    pub fn check_format(&self) -> Result<(), AppError> {
        if LOG_FORMATS.contains(&self.format.as_str()) {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Unknown log format '{}', expected one of: {}",
                self.format,
                LOG_FORMATS.join(", ")
            )))
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_known_formats_pass() {
        assert!(LoggingConfig::default().check_format().is_ok());
        let json = LoggingConfig {
            format: "json".to_string(),
            ..LoggingConfig::default()
        };
        assert!(json.check_format().is_ok());
    }

    #[test]
    fn test_unknown_format_is_a_validation_error() {
        let config = LoggingConfig {
            format: "xml".to_string(),
            ..LoggingConfig::default()
        };
        let err = config.check_format().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("xml"));
    }
}
