// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Blocking client for the bridge HTTP surface.
//!
//! Parameter paths go through the same resolver as the bridge, so the
//! extraction keys applied here match the envelopes the bridge serves.

use anyhow::{anyhow, Context, Result};
use arv_bridge::path::{self, API_PREFIX};
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::time::Duration;

/// Status interval used when the frame processor does not report one.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_millis(1000);

/// HTTP client bound to one bridge.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    http: Client,
}

impl GatewayClient {
    /// Client for `base_url` (e.g. `http://127.0.0.1:8888`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, request: &str) -> String {
        if request.starts_with('/') {
            format!("{}{}", self.base_url, request)
        } else {
            format!("{}{}/{}", self.base_url, API_PREFIX, request)
        }
    }

    /// GET a document. `request` is either a full URL path (`/api/0.1/...`)
    /// or a request path relative to the API prefix.
    pub fn get_document(&self, request: &str) -> Result<Value> {
        let url = self.url(request);
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("GET {}", url))?;
        decode(response)
    }

    /// PUT a JSON body; returns the bridge's answer.
    pub fn put_document(&self, request: &str, body: &Value) -> Result<Value> {
        let url = self.url(request);
        let response = self
            .http
            .put(&url)
            .json(body)
            .send()
            .with_context(|| format!("PUT {}", url))?;
        decode(response)
    }

    /// Single value at parameter path `raw`.
    pub fn get_value(&self, raw: &str) -> Result<Value> {
        let resolved = path::resolve(raw)?;
        let document = self.get_document(&resolved.url_path())?;
        Ok(resolved.extract(&document)?.clone())
    }

    /// Write a single value at parameter path `raw`.
    pub fn put_value(&self, raw: &str, value: Value) -> Result<Value> {
        let target = path::resolve_put(raw)?;
        self.put_document(&target.url_path(), &target.body(value))
    }

    /// How long the frame processor takes to refresh its status.
    pub fn status_interval(&self) -> Duration {
        self.get_value("fp/config/aravis/status_frequency_ms")
            .ok()
            .and_then(|v| v.as_f64())
            .filter(|ms| *ms > 0.0)
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(DEFAULT_STATUS_INTERVAL)
    }
}

fn decode(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().context("reading response body")?;
    let body: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).with_context(|| format!("decoding response ({})", status))?
    };

    if status.is_success() {
        return Ok(body);
    }
    // The downstream's own message wins over the bridge's summary.
    let message = body
        .get("error")
        .or_else(|| body.get("response"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string());
    Err(anyhow!(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = GatewayClient::new("http://127.0.0.1:8888/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8888");
        assert_eq!(
            client.url("/api/0.1/fp/config/hdf"),
            "http://127.0.0.1:8888/api/0.1/fp/config/hdf"
        );
        assert_eq!(
            client.url("aravis/config"),
            "http://127.0.0.1:8888/api/0.1/aravis/config"
        );
    }

    #[test]
    fn test_invalid_path_fails_before_any_request() {
        let client = GatewayClient::new("http://127.0.0.1:9").unwrap();
        let err = client.get_value("camera/x").unwrap_err();
        assert!(err.to_string().contains("Invalid path"));
    }

    #[test]
    fn test_status_interval_falls_back() {
        let client = GatewayClient::new("http://127.0.0.1:9").unwrap();
        assert_eq!(client.status_interval(), DEFAULT_STATUS_INTERVAL);
    }
}
