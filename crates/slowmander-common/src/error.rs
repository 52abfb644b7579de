//! Error types for loading and validating Slowmander's configuration.

use thiserror::Error;

/// Result type alias for Slowmander operations
pub type Result<T> = std::result::Result<T, SlowmanderError>;

/// Errors raised while preparing the bot to run.
///
/// Everything here is reported before the gateway connects; command-time
/// failures have their own error types in the commands crate.
#[derive(Error, Debug)]
pub enum SlowmanderError {
    /// The configuration could not be read, parsed, written, or applied.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O outside of configuration loading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value failed validation.
    #[error("Invalid `{field}`: {message}")]
    Validation {
        /// Why the value was rejected.
        message: String,
        /// Dotted path of the offending field, or the type being parsed.
        field: String,
    },
}

impl SlowmanderError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error caused by `source`.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a validation error for `field`.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.into(),
        }
    }

    /// The field a validation error names.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{error::Error, io};

    #[test]
    fn test_validation_names_field() {
        let error = SlowmanderError::invalid("commands.default_prefix", "Prefix cannot be empty");
        assert_eq!(
            error.to_string(),
            "Invalid `commands.default_prefix`: Prefix cannot be empty"
        );
        assert_eq!(error.field(), Some("commands.default_prefix"));
        assert_eq!(SlowmanderError::config("x").field(), None);
    }

    #[test]
    fn test_config_error_keeps_source() {
        let error = SlowmanderError::config_with_source(
            "Failed to read configuration file",
            io::Error::new(io::ErrorKind::PermissionDenied, "Access denied"),
        );
        assert_eq!(
            error.to_string(),
            "Configuration error: Failed to read configuration file"
        );
        assert!(error.source().is_some());
        assert!(SlowmanderError::config("no source").source().is_none());
    }

    #[test]
    fn test_io_error_conversion() {
        let error: SlowmanderError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(error.to_string().starts_with("I/O error"));
        assert!(error.source().is_some());
    }
}
