//! Per-endpoint statistics and the pool summary report

use std::fmt;

use serde::Serialize;
use tokio::time::Instant;

use crate::EndpointId;

/// Counters for one endpoint. Never reset during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    pub sent: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub last_used_at: Option<Instant>,
}

/// One row of the pool summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointSummary {
    pub id: EndpointId,
    pub transport: String,
    pub sent: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub cooling_down: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_secs_ago: Option<u64>,
}

/// Aggregated pool statistics, per endpoint and in total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolSummary {
    pub endpoints: Vec<EndpointSummary>,
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_rate_limited: u64,
    pub cooling_down: usize,
}

impl PoolSummary {
    pub(crate) fn from_rows(endpoints: Vec<EndpointSummary>) -> Self {
        let total_sent = endpoints.iter().map(|e| e.sent).sum();
        let total_failed = endpoints.iter().map(|e| e.failed).sum();
        let total_rate_limited = endpoints.iter().map(|e| e.rate_limited).sum();
        let cooling_down = endpoints.iter().filter(|e| e.cooling_down).count();
        Self {
            endpoints,
            total_sent,
            total_failed,
            total_rate_limited,
            cooling_down,
        }
    }
}

impl fmt::Display for PoolSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Endpoint pool: {} endpoints ({} cooling down)",
            self.endpoints.len(),
            self.cooling_down
        )?;
        for e in &self.endpoints {
            write!(
                f,
                "  {} sent={} failed={} rate_limited={}",
                e.id, e.sent, e.failed, e.rate_limited
            )?;
            if let Some(secs) = e.cooldown_remaining_secs {
                write!(f, " cooldown={secs}s")?;
            }
            match e.last_used_secs_ago {
                Some(secs) => writeln!(f, " last_used={secs}s ago")?,
                None => writeln!(f, " last_used=never")?,
            }
        }
        write!(
            f,
            "Total: sent={} failed={} rate_limited={}",
            self.total_sent, self.total_failed, self.total_rate_limited
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        id: usize,
        sent: u64,
        failed: u64,
        rate_limited: u64,
        cooling: bool,
    ) -> EndpointSummary {
        EndpointSummary {
            id: EndpointId(id),
            transport: "bot-api".into(),
            sent,
            failed,
            rate_limited,
            cooling_down: cooling,
            cooldown_remaining_secs: cooling.then_some(12),
            last_used_secs_ago: None,
        }
    }

    #[test]
    fn totals_sum_all_rows() {
        let summary = PoolSummary::from_rows(vec![
            row(0, 40, 1, 2, false),
            row(1, 35, 0, 0, true),
        ]);
        assert_eq!(summary.total_sent, 75);
        assert_eq!(summary.total_failed, 1);
        assert_eq!(summary.total_rate_limited, 2);
        assert_eq!(summary.cooling_down, 1);
    }

    #[test]
    fn display_lists_each_endpoint_and_totals() {
        let summary = PoolSummary::from_rows(vec![
            row(0, 40, 1, 2, false),
            row(1, 35, 0, 0, true),
        ]);
        let text = summary.to_string();
        assert!(text.starts_with("Endpoint pool: 2 endpoints (1 cooling down)"));
        assert!(text.contains("#0 sent=40 failed=1 rate_limited=2 last_used=never"));
        assert!(text.contains("#1 sent=35 failed=0 rate_limited=0 cooldown=12s"));
        assert!(text.ends_with("Total: sent=75 failed=1 rate_limited=2"));
    }

    #[test]
    fn serializes_without_empty_optionals() {
        let summary = PoolSummary::from_rows(vec![row(0, 1, 0, 0, false)]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["endpoints"][0]["id"], 0);
        assert!(json["endpoints"][0].get("cooldown_remaining_secs").is_none());
        assert_eq!(json["total_sent"], 1);
    }
}
