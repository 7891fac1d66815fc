//! Dispatch metrics
//!
//! Recorded through the `metrics` facade; the binary decides which recorder
//! (if any) is installed.
//!
//! - `dispatch_messages_total` (counter): label `outcome` = sent | failed
//! - `dispatch_send_errors_total` (counter): label `error_type`
//! - `dispatch_retry_exhausted_total` (counter)
//! - `dispatch_job_duration_seconds` (histogram)

/// Record the final outcome of one message.
pub fn record_message(success: bool) {
    let outcome = if success { "sent" } else { "failed" };
    metrics::counter!("dispatch_messages_total", "outcome" => outcome).increment(1);
}

/// Record one classified send failure (every attempt, not only final ones).
pub fn record_send_error(error_type: &'static str) {
    metrics::counter!("dispatch_send_errors_total", "error_type" => error_type).increment(1);
}

/// Record a message whose attempt budget ran out.
pub fn record_retry_exhausted() {
    metrics::counter!("dispatch_retry_exhausted_total").increment(1);
}

/// Record the wall time of a finished job.
pub fn record_job_duration(duration_secs: f64) {
    metrics::histogram!("dispatch_job_duration_seconds").record(duration_secs);
}
