use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

use crate::errors::AttemptError;

/// The one suspension point of a provider attempt: POST a JSON body and read
/// back a JSON value.
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, api_key: &str, body: &Value) -> Result<Value, AttemptError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build inference HTTP client")?;
        Ok(Self { http_client })
    }
}

impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, api_key: &str, body: &Value) -> Result<Value, AttemptError> {
        let response = self
            .http_client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(describe_request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(describe_request_error)?;

        if !status.is_success() {
            return Err(AttemptError::http_status(status.as_u16(), &preview(&text, 300)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            log::debug!("non-JSON body from {}: {} ({})", url, preview(&text, 120), e);
            AttemptError::UnextractableResponse
        })
    }
}

fn describe_request_error(err: reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        return AttemptError::transport(format!("request timed out: {err}"));
    }
    if err.is_connect() {
        return AttemptError::transport(format!("connection failed: {err}"));
    }
    AttemptError::transport(err.to_string())
}

/// First `max_chars` characters, with an ellipsis when cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
