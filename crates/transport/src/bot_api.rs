//! Bot API transport
//!
//! Sends messages through an HTTP bot API (`POST {api_url}/bot{token}/{method}`)
//! and classifies every failure into a `SendError`. Each configured bot token
//! becomes one `BotApiTransport`, i.e. one pool endpoint.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use common::Secret;
use serde::Deserialize;
use tracing::debug;

use crate::{Destination, MessageRef, Result, SendError, StatusSink, Transport};

/// Wait applied when a 429 carries no `retry_after` parameter.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
    #[serde(default)]
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Classify a bot API response by HTTP status and body.
///
/// Successful responses yield the `result` payload (or `Null`). Failures map:
/// 429 → RateLimited with the upstream `retry_after`, 408/5xx → Transient,
/// everything else → Permanent. The `error_code` field in the body wins over
/// the HTTP status when present.
pub fn classify_response(status: u16, body: &str) -> Result<serde_json::Value> {
    let parsed: Option<ApiResponse> = serde_json::from_str(body).ok();

    if (200..300).contains(&status) && parsed.as_ref().is_none_or(|r| r.ok) {
        return Ok(parsed
            .and_then(|r| r.result)
            .unwrap_or(serde_json::Value::Null));
    }

    let code = parsed
        .as_ref()
        .and_then(|r| r.error_code)
        .unwrap_or(status);
    let description = parsed
        .as_ref()
        .and_then(|r| r.description.clone())
        .unwrap_or_else(|| format!("HTTP {status}"));

    match code {
        429 => {
            let secs = parsed
                .as_ref()
                .and_then(|r| r.parameters.as_ref())
                .and_then(|p| p.retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            Err(SendError::RateLimited {
                retry_after: Duration::from_secs(secs),
            })
        }
        408 | 500..=599 => Err(SendError::Transient(description)),
        _ => Err(SendError::Permanent(description)),
    }
}

/// Classify a request-level failure (no response received).
///
/// The URL is stripped first since it embeds the bot token.
fn classify_request_error(err: reqwest::Error) -> SendError {
    let err = err.without_url();
    if err.is_timeout() {
        SendError::Transient(format!("timeout: {err}"))
    } else if err.is_connect() {
        SendError::Transient(format!("connection: {err}"))
    } else {
        SendError::Transient(format!("request: {err}"))
    }
}

/// One bot credential speaking the HTTP bot API.
pub struct BotApiTransport {
    client: reqwest::Client,
    api_url: String,
    token: Secret<String>,
    timeout: Duration,
}

impl BotApiTransport {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        token: Secret<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            token,
            timeout,
        }
    }

    /// Invoke a bot API method with a JSON payload.
    async fn call(&self, method: &str, payload: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!(
            "{}/bot{}/{method}",
            self.api_url.trim_end_matches('/'),
            self.token.expose()
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_request_error)?;
        debug!(method, status, "bot api response");
        classify_response(status, &body)
    }
}

impl Transport for BotApiTransport {
    fn id(&self) -> &str {
        "bot-api"
    }

    fn send<'a>(
        &'a self,
        destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let payload = serde_json::json!({
                "chat_id": destination.as_str(),
                "text": text,
            });
            self.call("sendMessage", payload).await.map(|_| ())
        })
    }
}

impl StatusSink for BotApiTransport {
    fn post<'a>(
        &'a self,
        destination: &'a Destination,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<MessageRef>> + Send + 'a>> {
        Box::pin(async move {
            let payload = serde_json::json!({
                "chat_id": destination.as_str(),
                "text": text,
            });
            let result = self.call("sendMessage", payload).await?;
            let message_id = result
                .get("message_id")
                .and_then(serde_json::Value::as_i64)
                .ok_or_else(|| {
                    SendError::Permanent("sendMessage result missing message_id".into())
                })?;
            Ok(MessageRef {
                destination: destination.clone(),
                message_id,
            })
        })
    }

    fn edit<'a>(
        &'a self,
        message: &'a MessageRef,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let payload = serde_json::json!({
                "chat_id": message.destination.as_str(),
                "message_id": message.message_id,
                "text": text,
            });
            self.call("editMessageText", payload).await.map(|_| ())
        })
    }
}
