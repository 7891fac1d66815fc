//! Bulk message dispatcher
//!
//! Single-binary tool that:
//! 1. Loads endpoint tokens and dispatch options from TOML
//! 2. Validates one send request from the command line
//! 3. Sends the messages through a round-robin endpoint pool, pacing itself
//!    and reporting progress to a status chat
//! 4. Prints the job summary and per-endpoint statistics

mod cli;
mod config;
mod metrics;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dispatch::{Dispatcher, ProgressReporter};
use endpoint_pool::Pool;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{BotApiTransport, Destination, StatusSink, Transport};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = cli::parse_args(&args)?;

    let config_path = Config::resolve_path(cli.config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        api_url = %config.transport.api_url,
        endpoints = config.endpoints.len(),
        metrics_listen_addr = ?config.metrics.listen_addr,
        "configuration loaded"
    );

    metrics::install(config.metrics.listen_addr).context("failed to install metrics recorder")?;

    // Reject malformed requests before touching any endpoint
    let dispatch_config = config.dispatch.to_dispatch_config();
    let job = cli
        .job_request()
        .validate(dispatch_config.max_messages)
        .context("invalid send request")?;

    let tokens = config
        .endpoint_tokens()
        .context("failed to resolve endpoint tokens")?;

    let client = reqwest::Client::new();
    let timeout = Duration::from_secs(config.transport.timeout_secs);
    let endpoints: Vec<Arc<BotApiTransport>> = tokens
        .into_iter()
        .map(|token| {
            Arc::new(BotApiTransport::new(
                client.clone(),
                config.transport.api_url.clone(),
                token,
                timeout,
            ))
        })
        .collect();

    // Status messages go out through the first endpoint
    let status_sink: Arc<dyn StatusSink> = endpoints
        .first()
        .cloned()
        .context("no endpoints configured")?;
    let status_destination = cli
        .status_chat
        .as_deref()
        .map(Destination::new)
        .unwrap_or_else(|| job.destination.clone());

    let pool = Arc::new(Pool::new(
        endpoints
            .into_iter()
            .map(|e| e as Arc<dyn Transport>)
            .collect(),
    )?);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("shutdown signal received, cancelling job after current message");
        let _ = cancel_tx.send(true);
    });

    let dispatcher = Dispatcher::new(pool.clone(), dispatch_config).with_cancellation(cancel_rx);
    let mut reporter = ProgressReporter::new(status_sink, status_destination);

    let summary = dispatcher.run(&job, &mut reporter).await;

    let pool_summary = pool.stats_summary().await;
    info!(
        job_id = %summary.job_id,
        pool = %serde_json::to_string(&pool_summary)?,
        status_failures = reporter.failures(),
        "endpoint pool statistics"
    );

    println!("{summary}\n\n{pool_summary}");

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
