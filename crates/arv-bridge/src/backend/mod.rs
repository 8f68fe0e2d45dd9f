// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Southbound backend abstraction.
//!
//! A backend executes requests against one downstream namespace (the
//! frame processor for `fp`). The bridge does not care how requests travel;
//! it only relies on the envelope shapes documented in [`crate::path`].
//!
//! # Implementations
//!
//! - [`HttpBackend`] -- frame processor control API over HTTP
//! - [`MockBackend`] -- in-memory simulated frame processor

mod http;
mod mock;

pub use http::HttpBackend;
pub use mock::MockBackend;

use crate::error::BackendError;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Downstream request executor.
pub trait Backend: Send + Sync {
    /// Fetch the document at `request` (namespace segment stripped).
    fn query(&self, request: &str) -> Result<Value, BackendError>;

    /// Apply `value` at `request`. Rejections carry the downstream's
    /// `error` string verbatim.
    fn write(&self, request: &str, value: &Value) -> Result<(), BackendError>;
}

/// Interpret a downstream write reply: `{}` acknowledges, `{"error": ...}`
/// rejects.
pub fn parse_ack(reply: &Value) -> Result<(), BackendError> {
    match reply {
        Value::Object(map) => match map.get("error") {
            None => Ok(()),
            Some(Value::String(message)) => Err(BackendError::Rejected(message.clone())),
            Some(other) => Err(BackendError::Rejected(other.to_string())),
        },
        Value::Null => Ok(()),
        other => Err(BackendError::Malformed(format!(
            "unexpected write reply: {}",
            other
        ))),
    }
}

/// Registry of backend bindings, at most one per namespace name.
#[derive(Default)]
pub struct BackendBindings {
    bindings: RwLock<HashMap<String, Arc<dyn Backend>>>,
}

impl BackendBindings {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` for `namespace`. An existing binding is replaced
    /// and returned.
    pub fn register(
        &self,
        namespace: impl Into<String>,
        backend: Arc<dyn Backend>,
    ) -> Option<Arc<dyn Backend>> {
        let namespace = namespace.into();
        let previous = self.bindings.write().insert(namespace.clone(), backend);
        if previous.is_some() {
            tracing::warn!("Backend for '{}' re-registered, previous binding dropped", namespace);
        } else {
            tracing::info!("Backend registered for '{}'", namespace);
        }
        previous
    }

    /// Binding for `namespace`, if registered.
    pub fn get(&self, namespace: &str) -> Option<Arc<dyn Backend>> {
        self.bindings.read().get(namespace).cloned()
    }

    /// Binding for `namespace`, or `NotConnected`.
    pub fn require(&self, namespace: &str) -> Result<Arc<dyn Backend>, BackendError> {
        self.get(namespace)
            .ok_or_else(|| BackendError::NotConnected(namespace.to_string()))
    }

    /// True if `namespace` has a binding.
    pub fn is_registered(&self, namespace: &str) -> bool {
        self.bindings.read().contains_key(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_ack() {
        assert!(parse_ack(&json!({})).is_ok());
        assert!(parse_ack(&Value::Null).is_ok());
        assert_eq!(
            parse_ack(&json!({"error": "Invalid exposure"})),
            Err(BackendError::Rejected("Invalid exposure".into()))
        );
        assert!(matches!(
            parse_ack(&json!([1, 2])),
            Err(BackendError::Malformed(_))
        ));
    }

    #[test]
    fn test_bindings_register_and_overwrite() {
        let bindings = BackendBindings::new();
        assert!(!bindings.is_registered("fp"));
        assert!(matches!(
            bindings.require("fp"),
            Err(BackendError::NotConnected(_))
        ));

        assert!(bindings
            .register("fp", Arc::new(MockBackend::camera()))
            .is_none());
        assert!(bindings.is_registered("fp"));
        assert!(bindings
            .register("fp", Arc::new(MockBackend::camera()))
            .is_some());
        assert!(bindings.require("fp").is_ok());
    }
}
