//! Custom error types for the common library
//!
//! This module defines the errors raised while persisting the session token
//! and while loading client configuration.

use thiserror::Error;

/// Error raised by a token storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the token file failed
    #[error("Token storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The token file exists but is not a JSON object
    #[error("Token storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised while loading client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    /// A value was read but is not usable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for Result with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;
