//! Endpoint pool for rate-limited bulk sending
//!
//! Holds a fixed set of credentialed endpoints, selects them round-robin, and
//! routes around endpoints that the upstream API has rate limited. The pool
//! owns all per-endpoint statistics; callers mutate them only through
//! `Pool::add_cooldown` and `Pool::record_outcome`.
//!
//! Endpoint lifecycle within a run:
//! 1. Created from configuration at startup, never removed
//! 2. Selected round-robin while no cooldown is active for it
//! 3. Upstream rate limit → cooldown entry until `now + retry_after + margin`
//! 4. Cooldown entries are evicted lazily on the next selection after expiry
//! 5. When every endpoint is cooling down, the one released soonest is used

pub mod cooldown;
pub mod error;
pub mod pool;
pub mod stats;

pub use cooldown::{CooldownEntry, CooldownTracker};
pub use error::{Error, Result};
pub use pool::{MAX_COOLDOWN, Pool, SelectedEndpoint};
pub use stats::{EndpointStats, EndpointSummary, PoolSummary};

use serde::Serialize;
use std::fmt;

/// Stable endpoint identity: its index in the configured endpoint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EndpointId(pub usize);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
