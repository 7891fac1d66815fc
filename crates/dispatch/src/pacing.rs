//! Tiered inter-message delay

use std::time::Duration;

use crate::config::DispatchConfig;

/// Two-tier pacing: a short base delay after each message and a longer batch
/// delay after every `batch_size`-th one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    batch_size: u32,
    base_delay: Duration,
    batch_delay: Duration,
}

impl Pacing {
    pub fn new(batch_size: u32, base_delay: Duration, batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            base_delay,
            batch_delay,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.batch_size, config.base_delay, config.batch_delay)
    }

    /// Delay to apply after message `seq` (1-based).
    pub fn delay_after(&self, seq: u32) -> Duration {
        if seq % self.batch_size == 0 {
            self.batch_delay
        } else {
            self.base_delay
        }
    }

    /// Mean delay over one batch.
    pub fn average_delay(&self) -> Duration {
        (self.base_delay * (self.batch_size - 1) + self.batch_delay) / self.batch_size
    }
}
