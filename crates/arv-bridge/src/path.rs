// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Path translation shared by the bridge and the operator CLI.
//!
//! A flat, human-typed path such as `aravis/config/exposure_time` maps onto
//! two things:
//!
//! - a request path understood by the owner of the namespace, and
//! - an ordered list of extraction keys that pull exactly one value out of
//!   the enveloped response document.
//!
//! # Envelopes
//!
//! ```text
//! fp      {"value": [ {<per-process fields>}, ... ]}   keys: value / 0 / <rest...>
//! aravis  {"<leaf>": {"value": ..., "writeable": ...}} keys: <leaf> / value
//!         {"config": {...}}                            keys: config
//! sys     {"<leaf>": ...}                              keys: <leaf>
//! ```

use crate::error::{BridgeError, Result};
use serde_json::Value;
use std::fmt;

/// Prefix of every northbound HTTP request.
pub const API_PREFIX: &str = "/api/0.1";

/// Known top-level namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Downstream frame processor, addressed by positional process list.
    Fp,
    /// Device-control parameter tree served by the bridge.
    Aravis,
    /// Bridge self-description.
    Sys,
}

impl Namespace {
    /// All namespaces, in listing order.
    pub const ALL: [Namespace; 3] = [Namespace::Aravis, Namespace::Fp, Namespace::Sys];

    /// Parse a first path segment.
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "fp" => Some(Self::Fp),
            "aravis" => Some(Self::Aravis),
            "sys" => Some(Self::Sys),
            _ => None,
        }
    }

    /// Segment name of this namespace.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fp => "fp",
            Self::Aravis => "aravis",
            Self::Sys => "sys",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a traversal into a response document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Mapping key. Also accepted as a list index when it parses as one.
    Field(String),
    /// List index.
    Index(usize),
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Result of resolving a read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Namespace named by the first segment.
    pub namespace: Namespace,
    /// Request path, including the namespace segment (e.g. `fp/config/hdf`).
    pub request: String,
    /// Extraction keys applied to the response document.
    pub keys: Vec<Key>,
}

impl Resolved {
    /// Northbound URL path for the request (`/api/0.1/<request>`).
    pub fn url_path(&self) -> String {
        format!("{}/{}", API_PREFIX, self.request)
    }

    /// Request path with the namespace segment stripped, as seen by the
    /// namespace owner (e.g. `config/hdf` for `fp/config/hdf`).
    pub fn backend_request(&self) -> &str {
        strip_namespace(&self.request)
    }

    /// Extract the addressed value from a response document.
    pub fn extract<'a>(&self, document: &'a Value) -> Result<&'a Value> {
        extract(document, &self.keys)
    }
}

/// Result of resolving a write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutTarget {
    /// Namespace named by the first segment.
    pub namespace: Namespace,
    /// Request path, including the namespace segment.
    pub request: String,
    /// When set, the written value is wrapped as `{key: value}`.
    pub body_key: Option<String>,
}

impl PutTarget {
    /// Northbound URL path for the request.
    pub fn url_path(&self) -> String {
        format!("{}/{}", API_PREFIX, self.request)
    }

    /// Request path with the namespace segment stripped.
    pub fn backend_request(&self) -> &str {
        strip_namespace(&self.request)
    }

    /// Request body carrying `value`.
    pub fn body(&self, value: Value) -> Value {
        match &self.body_key {
            Some(key) => {
                let mut body = serde_json::Map::new();
                body.insert(key.clone(), value);
                Value::Object(body)
            }
            None => value,
        }
    }
}

/// Split a raw path into segments. Leading and trailing slashes are ignored;
/// an empty path has no segments.
pub fn split(raw: &str) -> Vec<&str> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

fn strip_namespace(request: &str) -> &str {
    match request.split_once('/') {
        Some((_, rest)) => rest,
        None => "",
    }
}

fn namespace_of(raw: &str, segments: &[&str]) -> Result<Namespace> {
    let first = segments
        .first()
        .ok_or_else(|| BridgeError::InvalidPath("empty path".to_string()))?;
    Namespace::from_segment(first)
        .ok_or_else(|| BridgeError::InvalidPath(format!("unknown namespace in '{}'", raw)))
}

/// Resolve a read path into a request and extraction keys.
///
/// `fp` paths never join more than the first three segments into the
/// request; shorter paths produce a shorter request.
pub fn resolve(raw: &str) -> Result<Resolved> {
    let segments = split(raw);
    let namespace = namespace_of(raw, &segments)?;
    let last = segments[segments.len() - 1];

    let (request, keys) = match namespace {
        Namespace::Fp => {
            let head = segments.len().min(3);
            let mut keys = vec![Key::from("value"), Key::Index(0)];
            keys.extend(segments[head..].iter().map(|s| Key::from(*s)));
            (segments[..head].join("/"), keys)
        }
        Namespace::Aravis => {
            let keys = if last == "config" {
                vec![Key::from("config")]
            } else {
                vec![Key::from(last), Key::from("value")]
            };
            (segments.join("/"), keys)
        }
        Namespace::Sys => {
            let keys = if segments.len() > 1 {
                vec![Key::from(last)]
            } else {
                Vec::new()
            };
            (segments.join("/"), keys)
        }
    };

    Ok(Resolved {
        namespace,
        request,
        keys,
    })
}

/// Resolve a write path into a request and body shape.
///
/// `fp` writes address the parent document and wrap the value under the last
/// segment; `aravis` writes go to the leaf itself with a bare value.
pub fn resolve_put(raw: &str) -> Result<PutTarget> {
    let segments = split(raw);
    let namespace = namespace_of(raw, &segments)?;

    match namespace {
        Namespace::Fp => {
            if segments.len() < 2 {
                return Err(BridgeError::InvalidPath(format!(
                    "'{}' does not name a parameter",
                    raw
                )));
            }
            let (key, parent) = segments
                .split_last()
                .ok_or_else(|| BridgeError::InvalidPath(raw.to_string()))?;
            Ok(PutTarget {
                namespace,
                request: parent.join("/"),
                body_key: Some((*key).to_string()),
            })
        }
        Namespace::Aravis => Ok(PutTarget {
            namespace,
            request: segments.join("/"),
            body_key: None,
        }),
        Namespace::Sys => Err(BridgeError::ReadOnly(raw.to_string())),
    }
}

/// Walk `keys` into `document`.
pub fn extract<'a>(document: &'a Value, keys: &[Key]) -> Result<&'a Value> {
    let mut current = document;
    for (depth, key) in keys.iter().enumerate() {
        let next = match (key, current) {
            (Key::Field(name), Value::Object(map)) => map.get(name),
            (Key::Field(name), Value::Array(items)) => {
                name.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            (Key::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        };
        current = next.ok_or_else(|| BridgeError::PathNotFound(join_keys(&keys[..=depth])))?;
    }
    Ok(current)
}

fn join_keys(keys: &[Key]) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(items: &[Key]) -> Vec<Key> {
        items.to_vec()
    }

    #[test]
    fn test_resolve_fp_hdf_frames() {
        let r = resolve("fp/config/hdf/frames").unwrap();
        assert_eq!(r.namespace, Namespace::Fp);
        assert_eq!(r.request, "fp/config/hdf");
        assert_eq!(
            r.keys,
            keys(&["value".into(), 0usize.into(), "frames".into()])
        );
        assert_eq!(r.backend_request(), "config/hdf");
        assert_eq!(r.url_path(), "/api/0.1/fp/config/hdf");
    }

    #[test]
    fn test_resolve_fp_deep_path_appends_verbatim() {
        let r = resolve("fp/config/hdf/file/path").unwrap();
        assert_eq!(r.request, "fp/config/hdf");
        assert_eq!(
            r.keys,
            keys(&["value".into(), 0usize.into(), "file".into(), "path".into()])
        );
    }

    #[test]
    fn test_resolve_fp_short_paths_truncate() {
        let r = resolve("fp").unwrap();
        assert_eq!(r.request, "fp");
        assert_eq!(r.keys, keys(&["value".into(), 0usize.into()]));
        assert_eq!(r.backend_request(), "");

        let r = resolve("fp/status").unwrap();
        assert_eq!(r.request, "fp/status");
        assert_eq!(r.keys, keys(&["value".into(), 0usize.into()]));
    }

    #[test]
    fn test_fp_keys_always_start_with_process_envelope() {
        for raw in [
            "fp",
            "fp/config",
            "fp/config/aravis",
            "fp/status/aravis/frames_made",
            "fp/config/hdf/file/name",
        ] {
            let r = resolve(raw).unwrap();
            assert_eq!(&r.keys[..2], &[Key::from("value"), Key::Index(0)], "{}", raw);
        }
    }

    #[test]
    fn test_resolve_aravis_config() {
        let r = resolve("aravis/config").unwrap();
        assert_eq!(r.request, "aravis/config");
        assert_eq!(r.keys, keys(&["config".into()]));
    }

    #[test]
    fn test_resolve_aravis_literal_config_rule_any_depth() {
        let r = resolve("aravis/status/config").unwrap();
        assert_eq!(r.keys, keys(&["config".into()]));
    }

    #[test]
    fn test_resolve_aravis_leaf() {
        let r = resolve("aravis/config/exposure_time").unwrap();
        assert_eq!(r.request, "aravis/config/exposure_time");
        assert_eq!(r.keys, keys(&["exposure_time".into(), "value".into()]));
    }

    #[test]
    fn test_resolve_sys() {
        let r = resolve("sys").unwrap();
        assert_eq!(r.request, "sys");
        assert!(r.keys.is_empty());

        let r = resolve("sys/version").unwrap();
        assert_eq!(r.request, "sys/version");
        assert_eq!(r.keys, keys(&["version".into()]));
    }

    #[test]
    fn test_resolve_rejects_unknown_namespace() {
        assert!(matches!(
            resolve("camera/config"),
            Err(BridgeError::InvalidPath(_))
        ));
        assert!(matches!(resolve(""), Err(BridgeError::InvalidPath(_))));
        assert!(matches!(resolve("/"), Err(BridgeError::InvalidPath(_))));
    }

    #[test]
    fn test_resolve_ignores_surrounding_slashes() {
        assert_eq!(
            resolve("/fp/config/hdf/frames/").unwrap(),
            resolve("fp/config/hdf/frames").unwrap()
        );
    }

    #[test]
    fn test_resolve_put_fp_wraps_last_segment() {
        let t = resolve_put("fp/config/hdf/write").unwrap();
        assert_eq!(t.request, "fp/config/hdf");
        assert_eq!(t.backend_request(), "config/hdf");
        assert_eq!(t.body(json!(false)), json!({"write": false}));
    }

    #[test]
    fn test_resolve_put_aravis_is_direct() {
        let t = resolve_put("aravis/config/exposure_time").unwrap();
        assert_eq!(t.request, "aravis/config/exposure_time");
        assert_eq!(t.body(json!(12.5)), json!(12.5));
    }

    #[test]
    fn test_resolve_put_rejects_sys_and_bare_fp() {
        assert!(matches!(resolve_put("sys/version"), Err(BridgeError::ReadOnly(_))));
        assert!(matches!(resolve_put("fp"), Err(BridgeError::InvalidPath(_))));
    }

    #[test]
    fn test_extract_through_envelopes() {
        let doc = json!({"value": [{"frames": 10, "file": {"path": "/tmp"}}]});
        let r = resolve("fp/config/hdf/file/path").unwrap();
        assert_eq!(r.extract(&doc).unwrap(), &json!("/tmp"));

        let doc = json!({"exposure_time": {"value": 12.5, "writeable": true}});
        let r = resolve("aravis/config/exposure_time").unwrap();
        assert_eq!(r.extract(&doc).unwrap(), &json!(12.5));
    }

    #[test]
    fn test_extract_numeric_field_indexes_lists() {
        let doc = json!({"value": [{"cameras": ["a", "b"]}]});
        let keys = vec![
            Key::from("value"),
            Key::Index(0),
            Key::from("cameras"),
            Key::from("1"),
        ];
        assert_eq!(extract(&doc, &keys).unwrap(), &json!("b"));
    }

    #[test]
    fn test_extract_missing_key_reports_path() {
        let doc = json!({"value": []});
        let err = extract(&doc, &[Key::from("value"), Key::Index(0)]).unwrap_err();
        assert_eq!(err, BridgeError::PathNotFound("value/0".into()));
    }

    #[test]
    fn test_extract_empty_keys_returns_document() {
        let doc = json!({"version": "0.3.0"});
        assert_eq!(extract(&doc, &[]).unwrap(), &doc);
    }
}
