//! Cooldown tracking for rate-limited endpoints
//!
//! Entries live in a min-heap keyed by expiry so eviction drains from the
//! front. A per-endpoint index keeps the number of live entries and the
//! latest expiry, which makes membership checks O(1) regardless of how many
//! rate limits an endpoint has accumulated.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use tokio::time::Instant;

use crate::EndpointId;

/// One rate-limit signal: `endpoint` is unusable until `expires_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CooldownEntry {
    pub expires_at: Instant,
    pub endpoint: EndpointId,
}

#[derive(Debug, Clone, Copy)]
struct ActiveCooldown {
    entries: usize,
    until: Instant,
}

/// Time-ordered record of endpoints that are temporarily unusable.
///
/// Entries are appended, never merged; an endpoint with several live entries
/// stays cooled down until the last of them expires.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    heap: BinaryHeap<Reverse<CooldownEntry>>,
    active: HashMap<EndpointId, ActiveCooldown>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new cooldown entry.
    pub fn add(&mut self, endpoint: EndpointId, expires_at: Instant) {
        self.heap.push(Reverse(CooldownEntry {
            expires_at,
            endpoint,
        }));
        self.active
            .entry(endpoint)
            .and_modify(|a| {
                a.entries += 1;
                a.until = a.until.max(expires_at);
            })
            .or_insert(ActiveCooldown {
                entries: 1,
                until: expires_at,
            });
    }

    /// Drop every entry that expired at or before `now`. Returns how many
    /// entries were evicted.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let mut evicted = 0;
        while let Some(Reverse(entry)) = self.heap.peek().copied() {
            if entry.expires_at > now {
                break;
            }
            self.heap.pop();
            evicted += 1;

            if let Some(active) = self.active.get_mut(&entry.endpoint) {
                active.entries -= 1;
                if active.entries == 0 {
                    self.active.remove(&entry.endpoint);
                }
            }
        }
        evicted
    }

    /// Whether `endpoint` has at least one live entry.
    pub fn is_cooling(&self, endpoint: EndpointId) -> bool {
        self.active.contains_key(&endpoint)
    }

    /// Time left until `endpoint` is released, if it is cooling down.
    pub fn remaining(&self, endpoint: EndpointId, now: Instant) -> Option<Duration> {
        self.active
            .get(&endpoint)
            .map(|a| a.until.saturating_duration_since(now))
    }

    /// The cooled-down endpoint that will be released soonest. Ties go to the
    /// lowest id.
    pub fn earliest_release(&self) -> Option<EndpointId> {
        self.active
            .iter()
            .min_by_key(|(id, a)| (a.until, **id))
            .map(|(id, _)| *id)
    }

    /// Number of live entries (not endpoints).
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
