//! Prometheus exporter installation
//!
//! The dispatch crate records its counters through the `metrics` facade; this
//! module installs the recorder that backs them. `dispatch_job_duration_seconds`
//! gets explicit buckets so it renders as a histogram (with `_bucket` lines)
//! instead of a summary. Buckets span one second to three hours, which covers
//! a maximum-size job at the default pacing.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

const JOB_DURATION_BUCKETS: &[f64] = &[
    1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 7200.0, 10800.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("dispatch_job_duration_seconds".to_string()),
        JOB_DURATION_BUCKETS,
    )
}

/// Install the global Prometheus recorder.
///
/// With `listen_addr` set, also serves the scrape endpoint there for the life
/// of the process. Must be called from within the tokio runtime.
pub fn install(listen_addr: Option<SocketAddr>) -> Result<(), BuildError> {
    let builder = builder()?;
    match listen_addr {
        Some(addr) => builder.with_http_listener(addr).install(),
        None => builder.install_recorder().map(|_| ()),
    }
}
