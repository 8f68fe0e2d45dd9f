// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Route definitions.

use super::handlers;
use super::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// API 0.1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/0.1", get(handlers::adapters))
        .route(
            "/api/0.1/*path",
            get(handlers::get_path).put(handlers::put_path),
        )
}
