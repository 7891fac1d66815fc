//! Send capability abstraction for outbound messaging
//!
//! Defines the `Transport` trait the dispatch engine drives for every message
//! and the `StatusSink` trait used for progress reports. The engine never looks
//! past the `SendError` classification:
//! - RateLimited puts the endpoint into cooldown and rotates to another one
//! - Transient backs off and retries, possibly on the same endpoint
//! - Permanent fails the message immediately

pub mod bot_api;

pub use bot_api::{BotApiTransport, classify_response};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Opaque destination identifier (chat id, channel handle, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination(String);

impl Destination {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Destination {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Classified failure of a single send (or status update) call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Upstream asked this endpoint to wait before sending again
    #[error("rate limited, retry after {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// Timeout, connectivity loss or upstream 5xx
    #[error("transient fault: {0}")]
    Transient(String),

    /// Invalid destination, rejected content, revoked credential
    #[error("permanent fault: {0}")]
    Permanent(String),
}

impl SendError {
    /// Metrics/log label for the classification.
    pub fn label(&self) -> &'static str {
        match self {
            SendError::RateLimited { .. } => "rate_limited",
            SendError::Transient(_) => "transient",
            SendError::Permanent(_) => "permanent",
        }
    }
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, SendError>;

/// Handle to a posted status message that can later be edited in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub destination: Destination,
    pub message_id: i64,
}

/// One credentialed sender capable of delivering a text message.
///
/// Uses `Pin<Box<dyn Future>>` return types so endpoints can be held as
/// `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    /// Identifier for logging (e.g. "bot-api")
    fn id(&self) -> &str;

    /// Deliver `text` to `destination`.
    fn send<'a>(
        &'a self,
        destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Sink for job status messages.
pub trait StatusSink: Send + Sync {
    /// Post a new status message.
    fn post<'a>(
        &'a self,
        destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<MessageRef>> + Send + 'a>>;

    /// Replace the text of a previously posted status message.
    fn edit<'a>(
        &'a self,
        message: &'a MessageRef,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
