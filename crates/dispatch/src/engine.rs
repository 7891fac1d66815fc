//! Send-with-retry protocol and the bulk dispatch loop
//!
//! Retry strategy per message (`max_retry_attempts` attempts in total):
//! - RateLimited: cool the endpoint down for `retry_after + margin`, pause
//!   briefly, retry on a newly selected endpoint
//! - Transient: back off `2^attempt` seconds, retry (same endpoint allowed)
//! - Permanent: fail immediately, no retry
//!
//! The bulk loop only ever sees the final outcome of each message.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use endpoint_pool::{EndpointId, Pool};
use futures_util::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use transport::{Destination, SendError};

use crate::config::DispatchConfig;
use crate::job::DispatchJob;
use crate::metrics;
use crate::pacing::Pacing;
use crate::progress::{JobSummary, ProgressReporter, ProgressState};

/// Pause before retrying a rate-limited message on another endpoint.
const RATE_LIMIT_PAUSE: Duration = Duration::from_millis(500);

/// Base unit of the transient fault backoff.
const TRANSIENT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

fn backoff_delay(attempt: u32) -> Duration {
    TRANSIENT_BACKOFF_UNIT * 2u32.saturating_pow(attempt)
}

/// Outcome of `Dispatcher::send_one`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    pub success: bool,
    /// Endpoint that delivered or permanently rejected the message; `None`
    /// when the attempt budget ran out.
    pub endpoint: Option<EndpointId>,
    pub attempts: u32,
}

/// Drives sends through an endpoint pool.
pub struct Dispatcher {
    pool: Arc<Pool>,
    config: DispatchConfig,
    pacing: Pacing,
    cancel: Option<watch::Receiver<bool>>,
}

impl Dispatcher {
    pub fn new(pool: Arc<Pool>, config: DispatchConfig) -> Self {
        let pacing = Pacing::from_config(&config);
        Self {
            pool,
            config,
            pacing,
            cancel: None,
        }
    }

    /// Stop jobs before their next message once `cancel` reads `true`.
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Deliver one message, retrying rate limits and transient faults.
    pub async fn send_one(&self, destination: &Destination, text: &str) -> SendReport {
        let max_attempts = self.config.max_retry_attempts.max(1);

        for attempt in 0..max_attempts {
            let endpoint = self.pool.select().await;
            let retries_left = attempt + 1 < max_attempts;
            debug!(endpoint_id = %endpoint.id, attempt, "sending message");

            let err = match endpoint.transport.send(destination, text).await {
                Ok(()) => {
                    self.pool.record_outcome(endpoint.id, true).await;
                    return SendReport {
                        success: true,
                        endpoint: Some(endpoint.id),
                        attempts: attempt + 1,
                    };
                }
                Err(err) => err,
            };
            metrics::record_send_error(err.label());

            match err {
                SendError::RateLimited { retry_after } => {
                    let cooldown = retry_after.saturating_add(self.config.cooldown_safety_margin);
                    warn!(
                        endpoint_id = %endpoint.id,
                        attempt,
                        retry_after_secs = retry_after.as_secs(),
                        "endpoint rate limited, rotating"
                    );
                    self.pool.add_cooldown(endpoint.id, cooldown).await;
                    if retries_left {
                        tokio::time::sleep(RATE_LIMIT_PAUSE).await;
                    }
                }
                SendError::Transient(reason) => {
                    if retries_left {
                        let delay = backoff_delay(attempt);
                        warn!(
                            endpoint_id = %endpoint.id,
                            attempt,
                            error = %reason,
                            retry_in_ms = delay.as_millis() as u64,
                            "transient send fault, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            endpoint_id = %endpoint.id,
                            attempt,
                            error = %reason,
                            "transient send fault"
                        );
                    }
                }
                SendError::Permanent(reason) => {
                    warn!(
                        endpoint_id = %endpoint.id,
                        error = %reason,
                        "permanent send fault, not retrying"
                    );
                    self.pool.record_outcome(endpoint.id, false).await;
                    return SendReport {
                        success: false,
                        endpoint: Some(endpoint.id),
                        attempts: attempt + 1,
                    };
                }
            }
        }

        metrics::record_retry_exhausted();
        warn!(attempts = max_attempts, "message not delivered, attempts exhausted");
        SendReport {
            success: false,
            endpoint: None,
            attempts: max_attempts,
        }
    }

    /// Send every message of `job` in order and report progress.
    ///
    /// Per-message failures (including panics inside a transport) are counted
    /// and the loop moves on. Returns the final summary after it has been
    /// published.
    #[instrument(
        skip_all,
        fields(job_id = %job.id, count = job.count, destination = %job.destination)
    )]
    pub async fn run(&self, job: &DispatchJob, reporter: &mut ProgressReporter) -> JobSummary {
        info!(
            average_delay_ms = self.pacing.average_delay().as_millis() as u64,
            "dispatch job started"
        );
        let mut progress = ProgressState::new(job.count);
        let report_interval = self.config.report_interval.max(1);
        let mut cancelled = false;

        reporter.start(job.count).await;

        for seq in 1..=job.count {
            if self.is_cancelled() {
                warn!(seq, "dispatch job cancelled");
                cancelled = true;
                break;
            }

            let text = job.message_text(seq);
            let success = match AssertUnwindSafe(self.send_one(&job.destination, &text))
                .catch_unwind()
                .await
            {
                Ok(report) => report.success,
                Err(panic) => {
                    error!(
                        seq,
                        panic = %panic_message(panic.as_ref()),
                        "send panicked, counting message as failed"
                    );
                    false
                }
            };
            progress.record(success);
            metrics::record_message(success);

            if seq % report_interval == 0 || seq == job.count {
                let snapshot = progress.snapshot();
                info!(
                    processed = snapshot.processed,
                    sent = snapshot.sent,
                    failed = snapshot.failed,
                    rate = snapshot.rate,
                    "dispatch progress"
                );
                if let Err(panic) = AssertUnwindSafe(reporter.report(&snapshot))
                    .catch_unwind()
                    .await
                {
                    error!(
                        seq,
                        panic = %panic_message(panic.as_ref()),
                        "progress report panicked"
                    );
                }
            }

            if seq < job.count {
                tokio::time::sleep(self.pacing.delay_after(seq)).await;
            }
        }

        let summary = JobSummary {
            job_id: job.id.clone(),
            total: job.count,
            sent: progress.sent(),
            failed: progress.failed(),
            elapsed: progress.elapsed(),
            cancelled,
        };
        metrics::record_job_duration(summary.elapsed.as_secs_f64());
        info!(
            sent = summary.sent,
            failed = summary.failed,
            success_rate = summary.success_rate(),
            elapsed_secs = summary.elapsed.as_secs_f64(),
            cancelled,
            "dispatch job finished"
        );

        reporter.finish(&summary).await;
        summary
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
