//! Error types and handling for configuration resolution

use std::path::PathBuf;
use thiserror::Error;

/// Exit code conventionally used for configuration problems (`EX_CONFIG`)
pub const CONFIG_ERROR_EXIT_CODE: i32 = 78;

/// Main error type for configuration resolution
#[derive(Debug, Error)]
pub enum LintConfigError {
    /// User-facing configuration errors: nothing found, invalid `extends`,
    /// malformed `overrides`, ...
    #[error("{message}")]
    ConfigError { message: String },

    /// A configuration file was found but its contents could not be parsed
    #[error("Failed to parse configuration file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Parse,
    Io,
}

impl LintConfigError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LintConfigError::ConfigError { .. } => ErrorKind::Config,
            LintConfigError::ParseError { .. } => ErrorKind::Parse,
            LintConfigError::IoError { .. } => ErrorKind::Io,
        }
    }

    /// Whether this error signals a problem with the user's configuration
    pub fn is_config_error(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    /// Process exit code a host should use when reporting this error
    pub fn exit_code(&self) -> i32 {
        if self.is_config_error() {
            CONFIG_ERROR_EXIT_CODE
        } else {
            1
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a parse error for a configuration file
    pub fn parse_error(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}
