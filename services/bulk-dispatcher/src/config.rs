//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Bot tokens are never stored in the TOML directly: each endpoint names an
//! env var (`token_env`) or a file (`token_file`) holding its token.

use common::Secret;
use dispatch::DispatchConfig;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Upstream bot API settings
#[derive(Debug, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Where one endpoint's bot token comes from
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

/// Dispatch engine options. Unknown keys are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval: u32,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_cooldown_safety_margin_secs")]
    pub cooldown_safety_margin_secs: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            batch_size: default_batch_size(),
            base_delay_ms: default_base_delay_ms(),
            batch_delay_ms: default_batch_delay_ms(),
            report_interval: default_report_interval(),
            max_retry_attempts: default_max_retry_attempts(),
            cooldown_safety_margin_secs: default_cooldown_safety_margin_secs(),
        }
    }
}

impl DispatchSection {
    pub fn to_dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            max_messages: self.max_messages,
            batch_size: self.batch_size,
            base_delay: Duration::from_millis(self.base_delay_ms),
            batch_delay: Duration::from_millis(self.batch_delay_ms),
            report_interval: self.report_interval,
            max_retry_attempts: self.max_retry_attempts,
            cooldown_safety_margin: Duration::from_secs(self.cooldown_safety_margin_secs),
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Default, Deserialize)]
pub struct MetricsConfig {
    /// Serve `/metrics` here while the job runs; recorder only when unset
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_messages() -> u32 {
    10_000
}

fn default_batch_size() -> u32 {
    50
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_batch_delay_ms() -> u64 {
    2000
}

fn default_report_interval() -> u32 {
    100
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_cooldown_safety_margin_secs() -> u64 {
    1
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.transport.api_url.starts_with("http://")
            && !self.transport.api_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "api_url must start with http:// or https://, got: {}",
                self.transport.api_url
            )));
        }

        if self.transport.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.endpoints.is_empty() {
            return Err(common::Error::Config(
                "at least one [[endpoints]] entry is required".into(),
            ));
        }

        for (index, endpoint) in self.endpoints.iter().enumerate() {
            match (&endpoint.token_env, &endpoint.token_file) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(common::Error::Config(format!(
                        "endpoint {index} must set exactly one of token_env or token_file"
                    )));
                }
            }
        }

        let d = &self.dispatch;
        for (name, value) in [
            ("max_messages", u64::from(d.max_messages)),
            ("batch_size", u64::from(d.batch_size)),
            ("report_interval", u64::from(d.report_interval)),
            ("max_retry_attempts", u64::from(d.max_retry_attempts)),
            ("cooldown_safety_margin_secs", d.cooldown_safety_margin_secs),
        ] {
            if value == 0 {
                return Err(common::Error::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        Ok(())
    }

    /// Resolve every endpoint's bot token, in configuration order.
    pub fn endpoint_tokens(&self) -> common::Result<Vec<Secret<String>>> {
        self.endpoints
            .iter()
            .enumerate()
            .map(|(index, endpoint)| resolve_token(index, endpoint))
            .collect()
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("bulk-dispatcher.toml")
    }
}

fn resolve_token(index: usize, endpoint: &EndpointConfig) -> common::Result<Secret<String>> {
    let token = if let Some(var) = &endpoint.token_env {
        std::env::var(var).map_err(|_| common::Error::Secret {
            index,
            reason: format!("env var {var} not set"),
        })?
    } else if let Some(path) = &endpoint.token_file {
        std::fs::read_to_string(path).map_err(|e| common::Error::Secret {
            index,
            reason: format!("failed to read token_file {}: {e}", path.display()),
        })?
    } else {
        return Err(common::Error::Secret {
            index,
            reason: "no token source configured".into(),
        });
    };

    let token = token.trim().to_owned();
    if token.is_empty() {
        return Err(common::Error::Secret {
            index,
            reason: "token is empty".into(),
        });
    }
    Ok(Secret::new(token))
}
