// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Northbound operation surface.
//!
//! Two directions share the same envelopes:
//!
//! - [`ControlGateway::read`] / [`ControlGateway::write`] take request paths
//!   (`<namespace>/<rest>`) and return whole documents. This is what the HTTP
//!   adapter serves; `aravis` goes through the parameter store, `fp` straight
//!   to the registered backend.
//! - [`ControlGateway::read_value`] / [`ControlGateway::write_value`] take
//!   human-typed parameter paths, resolve them, and extract exactly one value
//!   from the document the first direction returns.

use crate::backend::{Backend, BackendBindings};
use crate::config::{BridgeConfig, ConfigError};
use crate::error::{BridgeError, Result};
use crate::path::{self, Namespace};
use crate::reconcile::{Plan, ReconcileStatsSnapshot, Reconciler};
use crate::store::ParameterStore;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bridge facade: parameter store, backend bindings and reconciliation loop.
pub struct ControlGateway {
    config: BridgeConfig,
    bindings: Arc<BackendBindings>,
    store: ParameterStore,
    reconciler: Reconciler,
    started: Instant,
}

impl ControlGateway {
    /// Validate `config`, build the parameter tree and start reconciling.
    /// No backend is bound yet; cycles are skipped until one is registered.
    pub fn start(config: BridgeConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let bindings = Arc::new(BackendBindings::new());
        let store = ParameterStore::from_specs(&config.parameters, Arc::clone(&bindings))?;
        let reconciler = Reconciler::spawn(
            Plan::from_sources(store.sources()),
            Arc::clone(&bindings),
            store.snapshot_cell(),
            config.poll_interval(),
        )?;

        tracing::info!(
            "Gateway '{}' started with {} parameters",
            config.name,
            store.leaf_paths().len()
        );

        Ok(Self {
            config,
            bindings,
            store,
            reconciler,
            started: Instant::now(),
        })
    }

    /// Bind `backend` to `namespace` (replacing any previous binding).
    pub fn register_backend(&self, namespace: &str, backend: Arc<dyn Backend>) {
        self.bindings.register(namespace, backend);
    }

    /// True if `namespace` has a backend.
    pub fn is_connected(&self, namespace: &str) -> bool {
        self.bindings.is_registered(namespace)
    }

    /// Active configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Parameter store.
    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// Reconciliation loop handle.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Names of the served namespaces.
    pub fn adapters(&self) -> Vec<&'static str> {
        Namespace::ALL.iter().map(|ns| ns.as_str()).collect()
    }

    /// Document at request path `raw`.
    pub fn read(&self, raw: &str) -> Result<Value> {
        let (namespace, segments) = split_request(raw)?;
        let rest = segments.join("/");
        tracing::debug!("read {}/{}", namespace, rest);

        match namespace {
            Namespace::Aravis => self.store.get(&rest),
            Namespace::Fp => Ok(self.bindings.require(namespace.as_str())?.query(&rest)?),
            Namespace::Sys => {
                let document = self.system_document();
                match segments.split_last() {
                    None => Ok(document),
                    Some((last, _)) => {
                        let keys: Vec<_> = segments.iter().map(|s| path::Key::from(*s)).collect();
                        let value = path::extract(&document, &keys)
                            .map_err(|_| BridgeError::PathNotFound(rest.clone()))?;
                        let mut wrapped = Map::new();
                        wrapped.insert((*last).to_string(), value.clone());
                        Ok(Value::Object(wrapped))
                    }
                }
            }
        }
    }

    /// Apply `value` at request path `raw`.
    pub fn write(&self, raw: &str, value: &Value) -> Result<()> {
        let (namespace, segments) = split_request(raw)?;
        let rest = segments.join("/");
        tracing::debug!("write {}/{} = {}", namespace, rest, value);

        match namespace {
            Namespace::Aravis => self.store.set(&rest, value),
            Namespace::Fp => {
                if rest.is_empty() {
                    return Err(BridgeError::InvalidPath(raw.to_string()));
                }
                let backend = self.bindings.require(namespace.as_str())?;
                backend.write(&rest, value).map_err(|e| {
                    tracing::warn!("Write to {} rejected: {}", raw, e);
                    BridgeError::from(e)
                })
            }
            Namespace::Sys => Err(BridgeError::ReadOnly(raw.trim_matches('/').to_string())),
        }
    }

    /// Single value addressed by parameter path `raw`.
    pub fn read_value(&self, raw: &str) -> Result<Value> {
        let resolved = path::resolve(raw)?;
        let document = self.read(&resolved.request)?;
        resolved.extract(&document).cloned()
    }

    /// Write a single value addressed by parameter path `raw`.
    pub fn write_value(&self, raw: &str, value: Value) -> Result<()> {
        let target = path::resolve_put(raw)?;
        self.write(&target.request, &target.body(value))
    }

    /// Write, wait for the next completed reconciliation cycle, and read the
    /// value back. The read-back reflects the downstream's view, which may
    /// differ from `value` if the downstream adjusted it.
    pub fn write_confirmed(&self, raw: &str, value: Value) -> Result<Value> {
        self.write_value(raw, value)?;
        if !self.reconciler.wait_for_cycle(self.config.confirm_timeout()) {
            tracing::warn!(
                "No reconciliation cycle within {:?} after writing {}",
                self.config.confirm_timeout(),
                raw
            );
        }
        self.read_value(raw)
    }

    /// Block until a cycle that starts after this call completes.
    pub fn wait_for_cycle(&self, timeout: Duration) -> bool {
        self.reconciler.wait_for_cycle(timeout)
    }

    /// Reconciliation counters.
    pub fn reconcile_stats(&self) -> ReconcileStatsSnapshot {
        self.reconciler.stats()
    }

    /// Kind (`cached` or `bound`) of every leaf, keyed by path.
    fn leaf_kinds(&self) -> Map<String, Value> {
        self.store
            .leaf_paths()
            .into_iter()
            .filter_map(|leaf| {
                let kind = self.store.kind(&leaf).ok()?;
                Some((leaf, Value::from(kind)))
            })
            .collect()
    }

    /// The `sys` namespace document.
    pub fn system_document(&self) -> Value {
        json!({
            "name": self.config.name,
            "version": env!("CARGO_PKG_VERSION"),
            "adapters": self.adapters(),
            "uptime_secs": self.started.elapsed().as_secs(),
            "backend_connected": self.is_connected(Namespace::Fp.as_str()),
            "parameters": self.store.leaf_paths().len(),
            "leaves": self.leaf_kinds(),
            "poll_interval_ms": self.reconciler.interval().as_millis() as u64,
            "reconciler": self.reconciler.stats(),
        })
    }

    /// Stop the reconciliation loop. Reads and writes keep working against
    /// the last snapshot.
    pub fn shutdown(&self) {
        tracing::info!("Gateway '{}' shutting down", self.config.name);
        self.reconciler.stop();
    }
}

fn split_request(raw: &str) -> Result<(Namespace, Vec<&str>)> {
    let segments = path::split(raw);
    let (first, rest) = segments
        .split_first()
        .ok_or_else(|| BridgeError::InvalidPath("empty path".to_string()))?;
    let namespace = Namespace::from_segment(first)
        .ok_or_else(|| BridgeError::InvalidPath(format!("unknown namespace in '{}'", raw)))?;
    Ok((namespace, rest.to_vec()))
}
