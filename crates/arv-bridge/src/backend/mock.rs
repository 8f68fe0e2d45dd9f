// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory simulated frame processor.
//!
//! Serves per-plugin documents in the `{"value": [ {...} ]}` process-list
//! envelope, merges accepted writes into the first process entry and
//! validates a handful of camera parameters the way the real plugin would.
//! Used by the tests and by `arv-bridge --simulate`.

use super::Backend;
use crate::error::BackendError;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Fields that the simulated camera refuses to take negative.
const NON_NEGATIVE: [&str; 3] = ["exposure_time", "frame_rate", "frame_count"];

#[derive(Debug, Default)]
struct MockState {
    /// Documents by request path (`<kind>/<plugin>`), first process entry only.
    documents: BTreeMap<String, Value>,
    fail_queries: u32,
    corrupt: bool,
    queries: u64,
    writes: Vec<(String, Value)>,
}

/// Simulated frame processor backend.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    /// Backend with no documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend simulating one Aravis camera plugin and one HDF writer.
    pub fn camera() -> Self {
        Self::new()
            .with_document(
                "config/aravis",
                json!({
                    "acquisition_mode": "Continuous",
                    "frame_count": 0,
                    "frame_rate": 30.0,
                    "exposure_time": 1000.0,
                    "pixel_format": "Mono8",
                    "status_frequency_ms": 200,
                    "camera_model": "Aravis Fake-GV01",
                    "ip_address": "127.0.0.1"
                }),
            )
            .with_document(
                "status/aravis",
                json!({
                    "camera_id": "Aravis-Fake-GV01",
                    "streaming": false,
                    "frames_made": 0,
                    "payload": 262144,
                    "connected_devices": 1,
                    "camera_0_id": "Aravis-Fake-GV01",
                    "camera_0_address": "127.0.0.1"
                }),
            )
            .with_document(
                "config/hdf",
                json!({
                    "frames": 0,
                    "write": false,
                    "master": "data",
                    "acquisition_id": "",
                    "process": {"number": 1, "rank": 0},
                    "file": {"path": "", "name": "", "extension": "h5"}
                }),
            )
            .with_document(
                "status/hdf",
                json!({"writing": false, "frames_written": 0}),
            )
    }

    /// Add (or replace) the first-process entry of a document.
    pub fn with_document(self, request: &str, entry: Value) -> Self {
        self.set_document(request, entry);
        self
    }

    /// Replace the first-process entry of a document.
    pub fn set_document(&self, request: &str, entry: Value) {
        self.state
            .lock()
            .documents
            .insert(request.trim_matches('/').to_string(), entry);
    }

    /// Current value of one field of a document.
    pub fn field(&self, request: &str, field: &str) -> Option<Value> {
        self.state
            .lock()
            .documents
            .get(request)
            .and_then(|entry| entry.get(field))
            .cloned()
    }

    /// Make the next `count` queries fail with a transport error.
    pub fn fail_next_queries(&self, count: u32) {
        self.state.lock().fail_queries = count;
    }

    /// Serve documents without the process-list envelope until reset.
    pub fn set_corrupt(&self, corrupt: bool) {
        self.state.lock().corrupt = corrupt;
    }

    /// Number of queries served (including failed ones).
    pub fn query_count(&self) -> u64 {
        self.state.lock().queries
    }

    /// Accepted writes, in order.
    pub fn writes(&self) -> Vec<(String, Value)> {
        self.state.lock().writes.clone()
    }
}

fn envelope(entry: Value) -> Value {
    json!({ "value": [entry] })
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

fn validate(patch: &Map<String, Value>) -> Result<(), BackendError> {
    for field in NON_NEGATIVE {
        if let Some(value) = patch.get(field) {
            match value.as_f64() {
                Some(v) if v < 0.0 => {
                    return Err(BackendError::Rejected(format!(
                        "{} must not be negative (got {})",
                        field, value
                    )))
                }
                Some(_) => {}
                None => {
                    return Err(BackendError::Rejected(format!(
                        "{} must be numeric (got {})",
                        field, value
                    )))
                }
            }
        }
    }
    Ok(())
}

impl Backend for MockBackend {
    fn query(&self, request: &str) -> Result<Value, BackendError> {
        let mut state = self.state.lock();
        state.queries += 1;

        if state.fail_queries > 0 {
            state.fail_queries -= 1;
            return Err(BackendError::Transport("simulated query failure".into()));
        }

        let request = request.trim_matches('/');
        let kind_prefix = format!("{}/", request);

        let document = if let Some(entry) = state.documents.get_mut(request) {
            if request == "status/aravis" && entry["streaming"] == json!(true) {
                let made = entry["frames_made"].as_u64().unwrap_or(0) + 1;
                entry["frames_made"] = json!(made);
            }
            entry.clone()
        } else {
            // Aggregate view of one kind, keyed by plugin (e.g. `config`).
            let plugins: Map<String, Value> = state
                .documents
                .iter()
                .filter_map(|(key, entry)| {
                    key.strip_prefix(&kind_prefix)
                        .map(|plugin| (plugin.to_string(), entry.clone()))
                })
                .collect();
            if plugins.is_empty() {
                return Err(BackendError::Rejected(format!("Invalid path: {}", request)));
            }
            Value::Object(plugins)
        };

        if state.corrupt {
            Ok(document)
        } else {
            Ok(envelope(document))
        }
    }

    fn write(&self, request: &str, value: &Value) -> Result<(), BackendError> {
        let request = request.trim_matches('/');
        if !request.starts_with("config/") {
            return Err(BackendError::Rejected(format!(
                "Invalid path: {} is not writable",
                request
            )));
        }

        let patch = value.as_object().ok_or_else(|| {
            BackendError::Rejected(format!("Expected an object for {}, got {}", request, value))
        })?;
        validate(patch)?;

        let mut state = self.state.lock();
        let entry = state
            .documents
            .get_mut(request)
            .ok_or_else(|| BackendError::Rejected(format!("Invalid path: {}", request)))?;
        merge(entry, value);

        if request == "config/aravis" {
            let streaming = if patch.contains_key("start") {
                Some(true)
            } else if patch.contains_key("stop") {
                Some(false)
            } else {
                None
            };
            if let Some(streaming) = streaming {
                if let Some(status) = state.documents.get_mut("status/aravis") {
                    status["streaming"] = json!(streaming);
                }
            }
        }

        state.writes.push((request.to_string(), value.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_wraps_in_process_envelope() {
        let backend = MockBackend::camera();
        let doc = backend.query("config/aravis").unwrap();
        assert_eq!(doc["value"][0]["pixel_format"], json!("Mono8"));
    }

    #[test]
    fn test_query_kind_aggregates_plugins() {
        let backend = MockBackend::camera();
        let doc = backend.query("config").unwrap();
        assert_eq!(doc["value"][0]["hdf"]["master"], json!("data"));
        assert_eq!(doc["value"][0]["aravis"]["frame_rate"], json!(30.0));
        assert!(matches!(
            backend.query("nothing/here"),
            Err(BackendError::Rejected(_))
        ));
    }

    #[test]
    fn test_write_merges_nested_fields() {
        let backend = MockBackend::camera();
        backend
            .write("config/hdf", &json!({"file": {"path": "/data"}, "frames": 5}))
            .unwrap();
        let doc = backend.query("config/hdf").unwrap();
        assert_eq!(doc["value"][0]["file"]["path"], json!("/data"));
        assert_eq!(doc["value"][0]["file"]["extension"], json!("h5"));
        assert_eq!(doc["value"][0]["frames"], json!(5));
        assert_eq!(backend.writes().len(), 1);
    }

    #[test]
    fn test_write_rejects_negative_exposure() {
        let backend = MockBackend::camera();
        let err = backend
            .write("config/aravis", &json!({"exposure_time": -1.0}))
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
        assert_eq!(
            backend.field("config/aravis", "exposure_time"),
            Some(json!(1000.0))
        );
        assert!(backend.writes().is_empty());
    }

    #[test]
    fn test_write_rejects_status_and_scalars() {
        let backend = MockBackend::camera();
        assert!(backend.write("status/aravis", &json!({"streaming": true})).is_err());
        assert!(backend.write("config/aravis", &json!(5)).is_err());
    }

    #[test]
    fn test_start_stop_drive_streaming() {
        let backend = MockBackend::camera();
        backend.write("config/aravis", &json!({"start": 1})).unwrap();
        assert_eq!(backend.field("status/aravis", "streaming"), Some(json!(true)));

        let first = backend.query("status/aravis").unwrap()["value"][0]["frames_made"].clone();
        let second = backend.query("status/aravis").unwrap()["value"][0]["frames_made"].clone();
        assert!(second.as_u64() > first.as_u64());

        backend.write("config/aravis", &json!({"stop": 1})).unwrap();
        assert_eq!(backend.field("status/aravis", "streaming"), Some(json!(false)));
    }

    #[test]
    fn test_failure_injection() {
        let backend = MockBackend::camera();
        backend.fail_next_queries(2);
        assert!(backend.query("config/aravis").is_err());
        assert!(backend.query("config/aravis").is_err());
        assert!(backend.query("config/aravis").is_ok());
        assert_eq!(backend.query_count(), 3);

        backend.set_corrupt(true);
        let doc = backend.query("config/aravis").unwrap();
        assert!(doc.get("value").is_none());
    }
}
