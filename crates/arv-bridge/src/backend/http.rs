// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame processor control API over HTTP.
//!
//! Uses a blocking client: calls come from the reconciliation thread and from
//! request handlers already moved off the async runtime. Construct and drop
//! it outside async contexts.

use super::{parse_ack, Backend};
use crate::error::BackendError;
use reqwest::blocking::{Client, Response};
use serde_json::Value;
use std::time::Duration;

/// HTTP backend for one downstream adapter base URL
/// (e.g. `http://127.0.0.1:8888/api/0.1/fp`).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    /// Create a backend with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, request: &str) -> String {
        let request = request.trim_matches('/');
        if request.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, request)
        }
    }
}

/// Decode a reply body; an empty body decodes as `null`.
fn decode(response: Response) -> Result<Value, BackendError> {
    let status = response.status();
    let text = response
        .text()
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    let body: Value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text)
            .map_err(|e| BackendError::Malformed(format!("{} (HTTP {})", e, status)))?
    };

    if status.is_success() {
        return Ok(body);
    }
    // Rejections come back as 4xx with the downstream's error string.
    match body.get("error").or_else(|| body.get("response")) {
        Some(Value::String(message)) => Err(BackendError::Rejected(message.clone())),
        _ => Err(BackendError::Transport(format!("HTTP {}", status))),
    }
}

impl Backend for HttpBackend {
    fn query(&self, request: &str) -> Result<Value, BackendError> {
        let url = self.url(request);
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        decode(response)
    }

    fn write(&self, request: &str, value: &Value) -> Result<(), BackendError> {
        let url = self.url(request);
        tracing::debug!("PUT {} {}", url, value);
        let response = self
            .client
            .put(&url)
            .json(value)
            .send()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        parse_ack(&decode(response)?)
    }
}
