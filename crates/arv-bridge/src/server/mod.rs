// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Northbound HTTP adapter.
//!
//! # Endpoints
//!
//! - `GET /api/0.1` - served namespaces
//! - `GET /api/0.1/<namespace>/<path>` - document at path
//! - `PUT /api/0.1/<namespace>/<path>` - write JSON body, answer with the
//!   fresh document
//!
//! Errors answer `{"response": "<message>"}`; backend failures also carry
//! `"error"` with the downstream's message.

mod handlers;
mod routes;

pub use handlers::ApiError;

use crate::gateway::ControlGateway;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
pub struct AppState {
    gateway: Arc<ControlGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<ControlGateway>) -> Self {
        Self { gateway }
    }
}

/// Router with CORS and request tracing.
pub fn build_router(gateway: Arc<ControlGateway>) -> Router {
    let state = Arc::new(AppState::new(gateway));

    Router::new()
        .merge(routes::api_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `gateway` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    gateway: Arc<ControlGateway>,
    listener: TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(gateway);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
