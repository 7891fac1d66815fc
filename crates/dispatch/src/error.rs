//! Job request errors

/// Reasons a job request is rejected before any message is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid message count: {0:?} is not a number")]
    InvalidCount(String),

    #[error("message count {count} out of range (1..={max})")]
    CountOutOfRange { count: i64, max: u32 },

    #[error("message template is empty")]
    EmptyTemplate,
}

/// Result alias for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;
