// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP request handlers.
//!
//! Gateway calls may block on the downstream, so every handler moves them
//! onto the blocking pool.

use super::AppState;
use crate::error::BridgeError;
use crate::gateway::ControlGateway;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// API error response
#[derive(Debug)]
pub struct ApiError {
    pub code: StatusCode,
    pub message: String,
    /// Downstream error string, for backend failures.
    pub error: Option<String>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST,
            message: message.into(),
            error: None,
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            error: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.error {
            Some(error) => json!({"response": self.message, "error": error}),
            None => json!({"response": self.message}),
        };
        (self.code, Json(body)).into_response()
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        if !err.is_user_error() {
            tracing::warn!("Downstream failure: {}", err);
        }
        let code =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let error = match &err {
            BridgeError::Backend(backend) => Some(backend.to_string()),
            _ => None,
        };
        Self {
            code,
            message: err.to_string(),
            error,
        }
    }
}

async fn blocking<T, F>(gateway: &Arc<ControlGateway>, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ControlGateway) -> Result<T, BridgeError> + Send + 'static,
{
    let gateway = Arc::clone(gateway);
    tokio::task::spawn_blocking(move || call(&gateway))
        .await
        .map_err(|e| ApiError::internal(format!("request task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// GET /api/0.1
pub async fn adapters(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "adapters": state.gateway.adapters() }))
}

/// GET /api/0.1/*path
pub async fn get_path(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let document = blocking(&state.gateway, move |gateway| gateway.read(&path)).await?;
    Ok(Json(document))
}

/// PUT /api/0.1/*path - body is any JSON value
pub async fn put_path(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Failed to decode PUT request body: {}", e)))?;

    let document = blocking(&state.gateway, move |gateway| {
        gateway.write(&path, &value)?;
        gateway.read(&path)
    })
    .await?;
    Ok(Json(document))
}
