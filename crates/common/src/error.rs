//! Configuration and startup errors shared by the dispatcher crates

use thiserror::Error;

/// Errors raised while loading configuration or endpoint secrets
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Endpoint {index} secret unavailable: {reason}")]
    Secret { index: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
