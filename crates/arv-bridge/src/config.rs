// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge configuration and parameter schema.
//!
//! Supports both programmatic and file-based configuration. The schema is
//! static: it is read once at startup and fixes the shape of the parameter
//! tree for the lifetime of the process.

use crate::path::{self, Namespace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Bridge name (reported by the `sys` namespace).
    #[serde(default = "default_name")]
    pub name: String,

    /// HTTP bind address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Reconciliation interval (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound on a write-then-confirm wait (milliseconds).
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_ms: u64,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Downstream frame processor connection.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Parameter schema.
    #[serde(default = "aravis_parameters")]
    pub parameters: Vec<ParameterSpec>,
}

fn default_name() -> String {
    "arv-bridge".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_poll_interval() -> u64 {
    200
}

fn default_confirm_timeout() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            bind: default_bind(),
            port: default_port(),
            poll_interval_ms: default_poll_interval(),
            confirm_timeout_ms: default_confirm_timeout(),
            log_level: default_log_level(),
            backend: BackendConfig::default(),
            parameters: aravis_parameters(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reconciliation interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Write confirmation timeout.
    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    /// Validate the configuration.
    ///
    /// Guarantees that every schema path names exactly one leaf of exactly
    /// one kind, and that every binding resolves into the `fp` namespace.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }

        if self.parameters.is_empty() {
            return Err(ConfigError::Invalid("No parameters configured".into()));
        }

        let mut leaves = HashSet::new();
        for (i, param) in self.parameters.iter().enumerate() {
            param
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("Parameter {}: {}", i, e)))?;

            let normalized = path::split(&param.path).join("/");
            if !leaves.insert(normalized.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "Parameter {} duplicates path '{}'",
                    i, normalized
                )));
            }
        }

        // A leaf may not also be an interior node of another leaf.
        for leaf in &leaves {
            let prefix = format!("{}/", leaf);
            if let Some(other) = leaves.iter().find(|other| other.starts_with(&prefix)) {
                return Err(ConfigError::Invalid(format!(
                    "Path '{}' is both a leaf and a branch of '{}'",
                    leaf, other
                )));
            }
        }

        Ok(())
    }
}

/// Downstream connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the frame processor control API
    /// (e.g. `http://127.0.0.1:8888/api/0.1/fp`). `None` leaves the bridge
    /// disconnected until a backend is registered programmatically.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout (milliseconds).
    #[serde(default = "default_backend_timeout")]
    pub timeout_ms: u64,
}

fn default_backend_timeout() -> u64 {
    5000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_backend_timeout(),
        }
    }
}

impl BackendConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Declarative description of one parameter leaf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterSpec {
    /// Tree path below the `aravis` namespace (e.g. `config/exposure_time`).
    pub path: String,

    /// `fp/...` path the value is reconciled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Fixed getter value (trigger parameters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<Value>,

    /// `fp/...` path written when the parameter is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<String>,

    /// Value reported before the first reconciliation cycle.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub initial: Value,
}

/// Leaf kind implied by a parameter spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// Reconciled from the backend, read-only to callers.
    Cached,
    /// Getter plus optional setter.
    Bound { writable: bool },
}

impl ParameterSpec {
    /// Reconciled, read-only parameter.
    pub fn cached(path: impl Into<String>, source: impl Into<String>, initial: Value) -> Self {
        Self {
            path: path.into(),
            source: Some(source.into()),
            constant: None,
            write: None,
            initial,
        }
    }

    /// Reconciled parameter written back through `write`.
    pub fn read_write(
        path: impl Into<String>,
        source: impl Into<String>,
        write: impl Into<String>,
        initial: Value,
    ) -> Self {
        Self {
            path: path.into(),
            source: Some(source.into()),
            constant: None,
            write: Some(write.into()),
            initial,
        }
    }

    /// Write-only trigger whose getter reports a constant.
    pub fn trigger(path: impl Into<String>, write: impl Into<String>, constant: Value) -> Self {
        Self {
            path: path.into(),
            source: None,
            constant: Some(constant),
            write: Some(write.into()),
            initial: Value::Null,
        }
    }

    /// Leaf kind this spec compiles to.
    pub fn kind(&self) -> LeafKind {
        match (&self.source, &self.write) {
            (Some(_), None) => LeafKind::Cached,
            (_, write) => LeafKind::Bound {
                writable: write.is_some(),
            },
        }
    }

    fn validate(&self) -> Result<(), String> {
        if path::split(&self.path).is_empty() {
            return Err("empty path".into());
        }
        if path::split(&self.path).iter().any(|s| s.is_empty()) {
            return Err(format!("path '{}' has an empty segment", self.path));
        }

        match (&self.source, &self.constant) {
            (None, None) => {
                return Err(format!(
                    "'{}' needs either a source or a constant",
                    self.path
                ))
            }
            (Some(_), Some(_)) => {
                return Err(format!(
                    "'{}' has both a source and a constant",
                    self.path
                ))
            }
            _ => {}
        }

        if let Some(source) = &self.source {
            let resolved = path::resolve(source).map_err(|e| e.to_string())?;
            if resolved.namespace != Namespace::Fp || resolved.keys.len() < 3 {
                return Err(format!(
                    "source '{}' must name a field below fp/<kind>/<plugin>",
                    source
                ));
            }
        }

        if let Some(write) = &self.write {
            let target = path::resolve_put(write).map_err(|e| e.to_string())?;
            if target.namespace != Namespace::Fp || target.backend_request().is_empty() {
                return Err(format!(
                    "write '{}' must name a field below fp/<kind>/<plugin>",
                    write
                ));
            }
        }

        Ok(())
    }
}

/// Built-in schema for the Aravis detector plugin.
pub fn aravis_parameters() -> Vec<ParameterSpec> {
    use serde_json::json;

    const CONFIG: &str = "fp/config/aravis";
    const STATUS: &str = "fp/status/aravis";

    let rw = |path: &str, field: &str, initial: Value| {
        let target = format!("{}/{}", CONFIG, field);
        ParameterSpec::read_write(path, target.clone(), target, initial)
    };
    let config = |path: &str, field: &str, initial: Value| {
        ParameterSpec::cached(path, format!("{}/{}", CONFIG, field), initial)
    };
    let status = |path: &str, field: &str, initial: Value| {
        ParameterSpec::cached(path, format!("{}/{}", STATUS, field), initial)
    };

    vec![
        rw("config/mode", "acquisition_mode", json!("")),
        rw("config/frame_count", "frame_count", json!(0)),
        config("config/frame_rate", "frame_rate", json!(0.0)),
        rw("config/exposure_time", "exposure_time", json!(0.0)),
        config("config/pixel_format", "pixel_format", Value::Null),
        ParameterSpec::trigger(
            "config/start_acquisition",
            format!("{}/start", CONFIG),
            json!(0),
        ),
        ParameterSpec::trigger(
            "config/stop_acquisition",
            format!("{}/stop", CONFIG),
            json!(0),
        ),
        status("status/camera_id", "camera_id", json!("")),
        status("status/streaming", "streaming", json!(false)),
        status("status/frames_captured", "frames_made", json!(0)),
        status("status/payload_bytes", "payload", json!(0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(200));
        assert_eq!(config.parameters.len(), 11);
    }

    #[test]
    fn test_leaf_kinds() {
        let params = aravis_parameters();
        let kind = |p: &str| params.iter().find(|s| s.path == p).unwrap().kind();
        assert_eq!(kind("status/camera_id"), LeafKind::Cached);
        assert_eq!(
            kind("config/exposure_time"),
            LeafKind::Bound { writable: true }
        );
        assert_eq!(
            kind("config/start_acquisition"),
            LeafKind::Bound { writable: true }
        );
        let constant = ParameterSpec {
            path: "config/version".into(),
            source: None,
            constant: Some(json!("1.0")),
            write: None,
            initial: Value::Null,
        };
        assert_eq!(constant.kind(), LeafKind::Bound { writable: false });
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let mut config = BridgeConfig::default();
        config
            .parameters
            .push(ParameterSpec::cached("config/mode", "fp/config/aravis/x", json!(0)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_leaf_branch_conflict() {
        let mut config = BridgeConfig::default();
        config.parameters.push(ParameterSpec::cached(
            "config/mode/extra",
            "fp/config/aravis/x",
            json!(0),
        ));
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("both a leaf and a branch"), "{}", err);
    }

    #[test]
    fn test_validation_rejects_bad_bindings() {
        let mut config = BridgeConfig {
            parameters: vec![ParameterSpec::cached("a", "sys/version", json!(0))],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.parameters = vec![ParameterSpec::cached("a", "fp/config", json!(0))];
        assert!(config.validate().is_err());

        config.parameters = vec![ParameterSpec {
            path: "a".into(),
            source: None,
            constant: None,
            write: None,
            initial: Value::Null,
        }];
        assert!(config.validate().is_err());

        config.parameters = vec![ParameterSpec::trigger("a", "aravis/config/x", json!(0))];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_schema() {
        let config = BridgeConfig {
            parameters: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            r#"
name = "lab-camera"
port = 9000
poll_interval_ms = 50

[backend]
endpoint = "http://127.0.0.1:8888/api/0.1/fp"

[[parameters]]
path = "config/gain"
source = "fp/config/aravis/gain"
write = "fp/config/aravis/gain"
initial = 1.0

[[parameters]]
path = "status/temperature"
source = "fp/status/aravis/temperature"
"#
        )
        .expect("write");

        let config = BridgeConfig::from_file(file.path()).expect("load");
        assert_eq!(config.name, "lab-camera");
        assert_eq!(config.port, 9000);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(
            config.backend.endpoint.as_deref(),
            Some("http://127.0.0.1:8888/api/0.1/fp")
        );
        assert_eq!(config.parameters.len(), 2);
        assert_eq!(config.parameters[0].initial, json!(1.0));
        assert_eq!(config.parameters[1].kind(), LeafKind::Cached);
    }

    #[test]
    fn test_config_serialization() {
        let config = BridgeConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        assert!(toml_str.contains("poll_interval_ms = 200"));
        assert!(toml_str.contains("source = \"fp/status/aravis/frames_made\""));
        let back: BridgeConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(back.parameters, config.parameters);
    }
}
