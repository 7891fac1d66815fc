//! Job progress tracking and status reporting
//!
//! `ProgressState` counts outcomes for one job. `ProgressReporter` turns
//! snapshots into status messages and keeps a single status message updated in
//! place; when an edit fails it posts a fresh message instead. Reporting
//! failures are logged and absorbed, never returned to the job loop.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};
use transport::{Destination, MessageRef, StatusSink};

/// Outcome counters for one job.
#[derive(Debug, Clone)]
pub struct ProgressState {
    total: u32,
    sent: u32,
    failed: u32,
    started_at: Instant,
}

impl ProgressState {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            sent: 0,
            failed: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record(&mut self, success: bool) {
        if success {
            self.sent += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }

    /// Messages whose outcome is resolved.
    pub fn processed(&self) -> u32 {
        self.sent + self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let elapsed = self.elapsed();
        let rate = rate_per_sec(self.sent, elapsed);
        let remaining = self.total.saturating_sub(self.processed());
        let eta = (rate > 0.0).then(|| Duration::from_secs_f64(f64::from(remaining) / rate));
        ProgressSnapshot {
            processed: self.processed(),
            total: self.total,
            sent: self.sent,
            failed: self.failed,
            elapsed,
            rate,
            eta,
        }
    }
}

fn rate_per_sec(sent: u32, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { f64::from(sent) / secs } else { 0.0 }
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole) * 100.0
    }
}

/// Point-in-time view of a job's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: u32,
    pub total: u32,
    pub sent: u32,
    pub failed: u32,
    pub elapsed: Duration,
    /// Delivered messages per second
    pub rate: f64,
    /// `None` while nothing has been delivered
    pub eta: Option<Duration>,
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eta = match self.eta {
            Some(eta) => format!("{}s", eta.as_secs()),
            None => "unknown".to_string(),
        };
        write!(
            f,
            "Sending messages...\nProgress: {}/{} ({:.1}%)\nSent: {} | Failed: {}\nRate: {:.2} msg/s | ETA: {eta}",
            self.processed,
            self.total,
            percent(self.processed, self.total),
            self.sent,
            self.failed,
            self.rate,
        )
    }
}

/// Final result of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSummary {
    pub job_id: String,
    pub total: u32,
    pub sent: u32,
    pub failed: u32,
    pub elapsed: Duration,
    /// Stopped early by the cancellation signal
    pub cancelled: bool,
}

impl JobSummary {
    pub fn attempted(&self) -> u32 {
        self.sent + self.failed
    }

    /// Delivered share of the requested count, in percent.
    pub fn success_rate(&self) -> f64 {
        percent(self.sent, self.total)
    }

    pub fn average_rate(&self) -> f64 {
        rate_per_sec(self.sent, self.elapsed)
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            writeln!(
                f,
                "Message sending cancelled after {}/{} messages.\n",
                self.attempted(),
                self.total
            )?;
        } else {
            writeln!(f, "Message sending complete!\n")?;
        }
        write!(
            f,
            "Successfully sent: {}\nFailed: {}\nSuccess rate: {:.1}%\nElapsed: {:.1}s\nAverage rate: {:.2} msg/s",
            self.sent,
            self.failed,
            self.success_rate(),
            self.elapsed.as_secs_f64(),
            self.average_rate(),
        )
    }
}

/// Publishes job status to a `StatusSink`, editing one message in place.
pub struct ProgressReporter {
    sink: Arc<dyn StatusSink>,
    destination: Destination,
    message: Option<MessageRef>,
    failures: u32,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn StatusSink>, destination: Destination) -> Self {
        Self {
            sink,
            destination,
            message: None,
            failures: 0,
        }
    }

    /// Announce the job before the first send.
    pub async fn start(&mut self, total: u32) {
        let text = format!("Starting to send {total} messages...\nProgress: 0/{total} (0%)");
        self.publish(&text).await;
    }

    pub async fn report(&mut self, snapshot: &ProgressSnapshot) {
        self.publish(&snapshot.to_string()).await;
    }

    pub async fn finish(&mut self, summary: &JobSummary) {
        self.publish(&summary.to_string()).await;
    }

    /// Status updates that could be neither edited nor posted.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Edit the current status message, or post a new one when there is none
    /// or the edit fails.
    async fn publish(&mut self, text: &str) {
        if let Some(message) = &self.message {
            match self.sink.edit(message, text).await {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        message_id = message.message_id,
                        error = %e,
                        "status edit failed, posting new status message"
                    );
                }
            }
        }

        match self.sink.post(&self.destination, text).await {
            Ok(message) => {
                debug!(message_id = message.message_id, "status message posted");
                self.message = Some(message);
            }
            Err(e) => {
                self.failures += 1;
                warn!(error = %e, "status post failed, continuing without status");
            }
        }
    }
}
