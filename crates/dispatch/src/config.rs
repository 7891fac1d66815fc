//! Dispatch tuning options

use std::time::Duration;

/// Options consumed by the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Upper bound on messages per job
    pub max_messages: u32,
    /// Every `batch_size`-th message is followed by `batch_delay`
    pub batch_size: u32,
    /// Delay after every other message
    pub base_delay: Duration,
    pub batch_delay: Duration,
    /// Emit a progress update every `report_interval` messages
    pub report_interval: u32,
    /// Attempts per message, including the first
    pub max_retry_attempts: u32,
    /// Added to the upstream `retry_after` when cooling an endpoint down
    pub cooldown_safety_margin: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_messages: 10_000,
            batch_size: 50,
            base_delay: Duration::from_millis(500),
            batch_delay: Duration::from_secs(2),
            report_interval: 100,
            max_retry_attempts: 3,
            cooldown_safety_margin: Duration::from_secs(1),
        }
    }
}
