//! Error types for pool operations

/// Errors from pool construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("endpoint pool requires at least one endpoint")]
    Empty,
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
