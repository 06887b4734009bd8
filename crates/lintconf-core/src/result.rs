//! Result type alias for configuration resolution

use crate::error::LintConfigError;

/// Standard Result type for configuration resolution
pub type Result<T> = std::result::Result<T, LintConfigError>;
