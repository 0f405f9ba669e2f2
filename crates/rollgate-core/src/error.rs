//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a deploy config.
///
/// All of these are fatal and surface before any backend call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}
