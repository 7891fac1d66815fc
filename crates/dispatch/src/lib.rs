//! Bulk dispatch engine
//!
//! Drives one bulk send job to completion against an `endpoint_pool::Pool`:
//! - `Dispatcher::send_one` delivers a single message, retrying rate limits on
//!   a freshly selected endpoint and transient faults with exponential backoff
//! - `Dispatcher::run` sends messages `1..=N` strictly in order, paces itself
//!   with a tiered delay, and reports progress through a `ProgressReporter`
//!
//! Individual message failures never abort a job. Only a malformed
//! `JobRequest` is rejected, before any sends occur.

pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod metrics;
pub mod pacing;
pub mod progress;

#[cfg(test)]
pub(crate) mod testing;

pub use config::DispatchConfig;
pub use engine::{Dispatcher, SendReport};
pub use error::{Error, Result};
pub use job::{DispatchJob, JobRequest};
pub use pacing::Pacing;
pub use progress::{JobSummary, ProgressReporter, ProgressSnapshot, ProgressState};
