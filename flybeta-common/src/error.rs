//! Common error types for FlyBeta

use thiserror::Error;

/// Common result type for FlyBeta operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across FlyBeta services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid user input (timestamps, identifiers, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
