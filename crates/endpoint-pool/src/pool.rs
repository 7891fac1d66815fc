//! Round-robin endpoint selection with cooldown routing
//!
//! The pool keeps a rotation cursor over a fixed endpoint array plus a
//! `CooldownTracker`. Selection evicts expired cooldowns lazily, then scans at
//! most one full rotation for an endpoint that is not cooling down. Selection
//! never fails: with every endpoint cooled down, the one released soonest is
//! returned so the caller can still attempt a send.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use transport::Transport;

use crate::cooldown::CooldownTracker;
use crate::error::{Error, Result};
use crate::stats::{EndpointStats, EndpointSummary, PoolSummary};
use crate::EndpointId;

/// Upper bound on a single cooldown; longer upstream waits are clamped.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

/// An endpoint handed out by `Pool::select`, ready for one send.
#[derive(Clone)]
pub struct SelectedEndpoint {
    pub id: EndpointId,
    pub transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for SelectedEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedEndpoint")
            .field("id", &self.id)
            .field("transport", &self.transport.id())
            .finish()
    }
}

/// Mutable routing state. Only touched while holding the pool lock.
struct PoolState {
    cursor: usize,
    cooldowns: CooldownTracker,
    stats: Vec<EndpointStats>,
}

/// Fixed pool of sending endpoints.
///
/// The `Mutex` serializes cooldown eviction, cursor movement and counter
/// updates, so a pool can be shared across tasks behind an `Arc`.
pub struct Pool {
    transports: Vec<Arc<dyn Transport>>,
    state: Mutex<PoolState>,
}

impl Pool {
    /// Create a pool from the configured endpoints, in order. Endpoint ids are
    /// the positions in `transports`.
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Result<Self> {
        if transports.is_empty() {
            return Err(Error::Empty);
        }
        let n = transports.len();
        info!(endpoints = n, "endpoint pool initialized");
        Ok(Self {
            transports,
            state: Mutex::new(PoolState {
                cursor: 0,
                cooldowns: CooldownTracker::new(),
                stats: vec![EndpointStats::default(); n],
            }),
        })
    }

    /// Number of endpoints in the pool.
    pub fn len(&self) -> usize {
        self.transports.len()
    }

    /// Always false; construction rejects an empty pool.
    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Select the next usable endpoint.
    ///
    /// Evicts expired cooldowns, then scans forward from the rotation cursor
    /// (wrapping, at most `len()` positions) for the first endpoint that is not
    /// cooling down, and moves the cursor past it. If all endpoints are cooling
    /// down, returns the endpoint whose cooldown ends first.
    pub async fn select(&self) -> SelectedEndpoint {
        let n = self.transports.len();
        let mut state = self.state.lock().await;

        let evicted = state.cooldowns.evict_expired(Instant::now());
        if evicted > 0 {
            debug!(evicted, "expired cooldown entries evicted");
        }

        let start = state.cursor % n;
        let found = (0..n)
            .map(|offset| (start + offset) % n)
            .find(|&idx| !state.cooldowns.is_cooling(EndpointId(idx)));

        let idx = match found {
            Some(idx) => idx,
            None => {
                // Every endpoint is cooling down, so some release exists
                let id = state.cooldowns.earliest_release().unwrap_or(EndpointId(start));
                warn!(
                    endpoint_id = %id,
                    "all endpoints cooling down, using earliest release"
                );
                id.0
            }
        };

        state.cursor = (idx + 1) % n;
        SelectedEndpoint {
            id: EndpointId(idx),
            transport: self.transports[idx].clone(),
        }
    }

    /// Put `id` into cooldown for `duration` (at most `MAX_COOLDOWN`) and
    /// count the rate limit.
    pub async fn add_cooldown(&self, id: EndpointId, duration: Duration) {
        let mut state = self.state.lock().await;
        let Some(stats) = state.stats.get_mut(id.0) else {
            warn!(endpoint_id = %id, "cooldown for unknown endpoint ignored");
            return;
        };
        stats.rate_limited += 1;

        let duration = duration.min(MAX_COOLDOWN);
        let expires_at = Instant::now() + duration;
        state.cooldowns.add(id, expires_at);
        info!(
            endpoint_id = %id,
            cooldown_secs = duration.as_secs(),
            "endpoint entering cooldown (rate limited)"
        );
    }

    /// Count one delivered or failed message against `id`.
    pub async fn record_outcome(&self, id: EndpointId, success: bool) {
        let mut state = self.state.lock().await;
        let Some(stats) = state.stats.get_mut(id.0) else {
            warn!(endpoint_id = %id, "outcome for unknown endpoint ignored");
            return;
        };
        if success {
            stats.sent += 1;
        } else {
            stats.failed += 1;
        }
        stats.last_used_at = Some(Instant::now());
    }

    /// Snapshot of one endpoint's counters.
    pub async fn stats(&self, id: EndpointId) -> Option<EndpointStats> {
        self.state.lock().await.stats.get(id.0).copied()
    }

    /// Number of live cooldown entries across all endpoints.
    pub async fn cooldown_entries(&self) -> usize {
        self.state.lock().await.cooldowns.len()
    }

    /// Per-endpoint and total counters. Read only; expired cooldowns are
    /// reported as released but not evicted.
    pub async fn stats_summary(&self) -> PoolSummary {
        let state = self.state.lock().await;
        let now = Instant::now();

        let rows = self
            .transports
            .iter()
            .enumerate()
            .map(|(idx, transport)| {
                let id = EndpointId(idx);
                let stats = state.stats[idx];
                let remaining = state
                    .cooldowns
                    .remaining(id, now)
                    .filter(|d| !d.is_zero());
                EndpointSummary {
                    id,
                    transport: transport.id().to_string(),
                    sent: stats.sent,
                    failed: stats.failed,
                    rate_limited: stats.rate_limited,
                    cooling_down: remaining.is_some(),
                    cooldown_remaining_secs: remaining.map(|d| d.as_secs()),
                    last_used_secs_ago: stats
                        .last_used_at
                        .map(|at| now.saturating_duration_since(at).as_secs()),
                }
            })
            .collect();

        PoolSummary::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use transport::Destination;

    struct NullTransport;

    impl Transport for NullTransport {
        fn id(&self) -> &str {
            "null"
        }

        fn send<'a>(
            &'a self,
            _destination: &'a Destination,
            _text: &'a str,
        ) -> Pin<Box<dyn Future<Output = transport::Result<()>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn pool_of(n: usize) -> Pool {
        let transports: Vec<Arc<dyn Transport>> = (0..n)
            .map(|_| Arc::new(NullTransport) as Arc<dyn Transport>)
            .collect();
        Pool::new(transports).unwrap()
    }

    const LONG: Duration = Duration::from_secs(3600);

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(Pool::new(vec![]), Err(Error::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn round_robin_visits_each_endpoint_once_per_rotation() {
        let pool = pool_of(3);

        let mut ids = Vec::new();
        for _ in 0..6 {
            ids.push(pool.select().await.id.0);
        }
        assert_eq!(ids, vec![0, 1, 2, 0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_cooled_down_endpoints_until_all_are_cooling() {
        let pool = pool_of(3);
        pool.add_cooldown(EndpointId(0), LONG).await;
        pool.add_cooldown(EndpointId(1), LONG + Duration::from_secs(10))
            .await;

        for _ in 0..5 {
            assert_eq!(pool.select().await.id, EndpointId(2));
        }

        // Now everything is cooling; #0 is released first
        pool.add_cooldown(EndpointId(2), LONG + Duration::from_secs(20))
            .await;
        assert_eq!(pool.select().await.id, EndpointId(0));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_is_evicted_lazily_after_expiry() {
        let pool = pool_of(2);
        pool.add_cooldown(EndpointId(0), Duration::from_secs(5)).await;

        assert_eq!(pool.select().await.id, EndpointId(1));
        assert_eq!(pool.select().await.id, EndpointId(1));

        tokio::time::advance(Duration::from_secs(6)).await;
        // Entry is still recorded until a selection evicts it
        assert_eq!(pool.cooldown_entries().await, 1);

        let picks = [pool.select().await.id, pool.select().await.id];
        assert!(picks.contains(&EndpointId(0)), "got: {picks:?}");
        assert_eq!(pool.cooldown_entries().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_expiring_exactly_now_is_evicted() {
        let pool = pool_of(1);
        pool.add_cooldown(EndpointId(0), Duration::from_secs(5)).await;
        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(pool.select().await.id, EndpointId(0));
        assert_eq!(pool.cooldown_entries().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_cooldown_is_clamped() {
        let pool = pool_of(2);
        pool.add_cooldown(EndpointId(0), Duration::MAX).await;
        pool.add_cooldown(EndpointId(0), Duration::from_secs(u64::MAX / 2))
            .await;

        assert_eq!(pool.stats(EndpointId(0)).await.unwrap().rate_limited, 2);
        assert_eq!(pool.select().await.id, EndpointId(1));

        let summary = pool.stats_summary().await;
        assert_eq!(
            summary.endpoints[0].cooldown_remaining_secs,
            Some(MAX_COOLDOWN.as_secs())
        );

        tokio::time::advance(MAX_COOLDOWN).await;
        let picks = [pool.select().await.id, pool.select().await.id];
        assert!(picks.contains(&EndpointId(0)), "got: {picks:?}");
        assert_eq!(pool.cooldown_entries().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn single_endpoint_is_returned_even_while_cooling() {
        let pool = pool_of(1);
        pool.add_cooldown(EndpointId(0), LONG).await;
        assert_eq!(pool.select().await.id, EndpointId(0));
    }

    #[tokio::test(start_paused = true)]
    async fn add_cooldown_counts_rate_limits() {
        let pool = pool_of(2);
        pool.add_cooldown(EndpointId(1), Duration::from_secs(2)).await;
        pool.add_cooldown(EndpointId(1), Duration::from_secs(4)).await;

        let stats = pool.stats(EndpointId(1)).await.unwrap();
        assert_eq!(stats.rate_limited, 2);
        assert_eq!(pool.cooldown_entries().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn record_outcome_updates_counters_and_last_used() {
        let pool = pool_of(2);
        pool.record_outcome(EndpointId(0), true).await;
        pool.record_outcome(EndpointId(0), true).await;
        pool.record_outcome(EndpointId(0), false).await;

        let stats = pool.stats(EndpointId(0)).await.unwrap();
        assert_eq!(stats.sent, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.last_used_at, Some(Instant::now()));

        let untouched = pool.stats(EndpointId(1)).await.unwrap();
        assert_eq!(untouched, EndpointStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_endpoint_updates_are_ignored() {
        let pool = pool_of(1);
        pool.record_outcome(EndpointId(7), true).await;
        pool.add_cooldown(EndpointId(7), LONG).await;

        assert_eq!(pool.cooldown_entries().await, 0);
        assert_eq!(pool.stats_summary().await.total_sent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_summary_aggregates_without_mutating() {
        let pool = pool_of(3);
        pool.record_outcome(EndpointId(0), true).await;
        pool.record_outcome(EndpointId(1), true).await;
        pool.record_outcome(EndpointId(1), false).await;
        pool.add_cooldown(EndpointId(2), Duration::from_secs(30)).await;
        tokio::time::advance(Duration::from_secs(10)).await;

        let summary = pool.stats_summary().await;
        assert_eq!(summary.total_sent, 2);
        assert_eq!(summary.total_failed, 1);
        assert_eq!(summary.total_rate_limited, 1);
        assert_eq!(summary.cooling_down, 1);
        assert_eq!(summary.endpoints[2].cooldown_remaining_secs, Some(20));
        assert_eq!(summary.endpoints[0].last_used_secs_ago, Some(10));
        assert_eq!(summary.endpoints[2].last_used_secs_ago, None);

        // Reading twice yields the same report
        assert_eq!(pool.stats_summary().await, summary);
    }
}
