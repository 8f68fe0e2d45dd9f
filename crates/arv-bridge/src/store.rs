// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parameter tree served under the `aravis` namespace.
//!
//! The tree is compiled once from the parameter schema and never changes
//! shape. Leaves are one of:
//!
//! - [`CachedLeaf`] -- a slot of the reconciled snapshot, read-only to callers
//! - [`BoundLeaf`] -- a getter plus an optional setter; the setter is the only
//!   place where a store operation touches the network
//!
//! Reads take a single snapshot load per call, so a whole subtree is always
//! rendered from one reconciliation cycle.

use crate::backend::BackendBindings;
use crate::config::{ConfigError, LeafKind, ParameterSpec};
use crate::error::{BackendError, BridgeError, Result};
use crate::path::{self, Resolved};
use crate::snapshot::{Snapshot, SnapshotCell};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Pure read of the current value.
pub type Getter = Arc<dyn Fn(&Snapshot) -> Value + Send + Sync>;

/// Side-effecting write of a new value.
pub type Setter = Arc<dyn Fn(&Value) -> std::result::Result<(), BackendError> + Send + Sync>;

/// Node of the parameter tree.
pub enum Node {
    Branch(Branch),
    Cached(CachedLeaf),
    Bound(BoundLeaf),
}

/// Interior node. Children keep schema order.
#[derive(Default)]
pub struct Branch {
    children: Vec<(String, Node)>,
}

/// Leaf holding a reconciled value.
pub struct CachedLeaf {
    slot: String,
}

/// Leaf backed by a getter and an optional setter.
pub struct BoundLeaf {
    getter: Getter,
    setter: Option<Setter>,
}

/// Reconciled value source of one snapshot slot.
#[derive(Debug, Clone)]
pub struct Source {
    /// Snapshot slot (normalized leaf path).
    pub slot: String,
    /// Resolved `fp` source path.
    pub resolved: Resolved,
}

impl Branch {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|(child, _)| child == name)
            .map(|(_, node)| node)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children
            .iter_mut()
            .find(|(child, _)| child == name)
            .map(|(_, node)| node)
    }
}

impl BoundLeaf {
    /// Leaf with a custom getter and optional setter.
    pub fn new(getter: Getter, setter: Option<Setter>) -> Self {
        Self { getter, setter }
    }
}

impl Node {
    fn is_writable(&self) -> bool {
        match self {
            Node::Branch(_) => true,
            Node::Cached(_) => false,
            Node::Bound(leaf) => leaf.setter.is_some(),
        }
    }

    fn plain(&self, snapshot: &Snapshot) -> Value {
        match self {
            Node::Branch(branch) => Value::Object(
                branch
                    .children
                    .iter()
                    .map(|(name, child)| (name.clone(), child.plain(snapshot)))
                    .collect(),
            ),
            Node::Cached(leaf) => snapshot.get(&leaf.slot).cloned().unwrap_or(Value::Null),
            Node::Bound(leaf) => (leaf.getter)(snapshot),
        }
    }

    fn with_metadata(&self, snapshot: &Snapshot) -> Value {
        match self {
            Node::Branch(branch) => Value::Object(
                branch
                    .children
                    .iter()
                    .map(|(name, child)| (name.clone(), child.with_metadata(snapshot)))
                    .collect(),
            ),
            leaf => {
                let value = leaf.plain(snapshot);
                json!({
                    "value": value,
                    "writeable": leaf.is_writable(),
                    "type": type_name(&value),
                })
            }
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Node::Branch(_) => "branch",
            Node::Cached(_) => "cached",
            Node::Bound(_) => "bound",
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Branch(branch) => f
                .debug_map()
                .entries(branch.children.iter().map(|(k, v)| (k, v)))
                .finish(),
            Node::Cached(leaf) => write!(f, "Cached({})", leaf.slot),
            Node::Bound(leaf) => write!(
                f,
                "Bound({})",
                if leaf.setter.is_some() { "rw" } else { "ro" }
            ),
        }
    }
}

/// Type tag reported in leaf metadata.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Schema-built parameter tree over the shared snapshot.
pub struct ParameterStore {
    root: Node,
    snapshot: Arc<SnapshotCell>,
    sources: Vec<Source>,
}

impl ParameterStore {
    /// Compile `specs` into a tree. Setters write through the binding of the
    /// namespace their `write` path names, looked up at call time.
    pub fn from_specs(
        specs: &[ParameterSpec],
        bindings: Arc<BackendBindings>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut root = Node::Branch(Branch::default());
        let mut initial = HashMap::new();
        let mut sources = Vec::new();

        for spec in specs {
            let slot = path::split(&spec.path).join("/");
            let node = compile(spec, &slot, &bindings)?;

            if let Some(source) = &spec.source {
                let resolved =
                    path::resolve(source).map_err(|e| ConfigError::Invalid(e.to_string()))?;
                sources.push(Source {
                    slot: slot.clone(),
                    resolved,
                });
                initial.insert(slot.clone(), spec.initial.clone());
            }

            insert(&mut root, &slot, node)?;
        }

        Ok(Self {
            root,
            snapshot: Arc::new(SnapshotCell::new(Snapshot::initial(initial))),
            sources,
        })
    }

    /// Snapshot cell shared with the reconciliation loop.
    pub fn snapshot_cell(&self) -> Arc<SnapshotCell> {
        Arc::clone(&self.snapshot)
    }

    /// Reconciled slots and where they come from.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    fn lookup<'a>(&'a self, raw: &'a str) -> Result<(Option<&'a str>, &'a Node)> {
        let segments = path::split(raw);
        let mut node = &self.root;
        for (depth, segment) in segments.iter().enumerate() {
            node = match node {
                Node::Branch(branch) => branch.child(segment),
                _ => None,
            }
            .ok_or_else(|| BridgeError::PathNotFound(segments[..=depth].join("/")))?;
        }
        Ok((segments.last().copied(), node))
    }

    /// Value at `path` with metadata, wrapped under the last segment:
    /// `{"<leaf>": {"value", "writeable", "type"}}` for a leaf,
    /// `{"<branch>": {...}}` for a branch. The empty path yields the whole
    /// tree unwrapped.
    pub fn get(&self, raw: &str) -> Result<Value> {
        let (name, node) = self.lookup(raw)?;
        let snapshot = self.snapshot.load();
        let rendered = node.with_metadata(&snapshot);
        Ok(match name {
            Some(name) => {
                let mut wrapped = Map::new();
                wrapped.insert(name.to_string(), rendered);
                Value::Object(wrapped)
            }
            None => rendered,
        })
    }

    /// Bare value at `path` (branches render as nested maps of values).
    pub fn value(&self, raw: &str) -> Result<Value> {
        let (_, node) = self.lookup(raw)?;
        Ok(node.plain(&self.snapshot.load()))
    }

    /// Write `value` at `path`.
    ///
    /// A leaf write invokes its setter. A branch write takes an object whose
    /// keys name children; the whole object is checked before any setter
    /// runs. The snapshot is never touched here.
    ///
    /// Setters of a branch write run one child at a time in key order and
    /// stop at the first downstream rejection. Children written before it
    /// stay written; the error carries the path of the rejected child.
    pub fn set(&self, raw: &str, value: &Value) -> Result<()> {
        let (_, node) = self.lookup(raw)?;
        let base = path::split(raw).join("/");
        check(node, value, &base)?;
        apply(node, value, &base)
    }

    /// Normalized paths of every leaf, in schema order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(&self.root, "", &mut out);
        out
    }

    /// Kind of the node at `path` (`branch`, `cached` or `bound`).
    pub fn kind(&self, raw: &str) -> Result<&'static str> {
        Ok(self.lookup(raw)?.1.kind_name())
    }
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStore")
            .field("root", &self.root)
            .field("generation", &self.snapshot.load().generation())
            .finish()
    }
}

fn compile(
    spec: &ParameterSpec,
    slot: &str,
    bindings: &Arc<BackendBindings>,
) -> std::result::Result<Node, ConfigError> {
    let getter: Getter = match &spec.constant {
        Some(constant) => {
            let constant = constant.clone();
            Arc::new(move |_: &Snapshot| constant.clone())
        }
        None => {
            let slot = slot.to_string();
            Arc::new(move |snapshot: &Snapshot| {
                snapshot.get(&slot).cloned().unwrap_or(Value::Null)
            })
        }
    };

    match spec.kind() {
        LeafKind::Cached => Ok(Node::Cached(CachedLeaf {
            slot: slot.to_string(),
        })),
        LeafKind::Bound { writable: false } => Ok(Node::Bound(BoundLeaf::new(getter, None))),
        LeafKind::Bound { writable: true } => {
            let write = spec.write.as_deref().unwrap_or_default();
            let target =
                path::resolve_put(write).map_err(|e| ConfigError::Invalid(e.to_string()))?;
            let bindings = Arc::clone(bindings);
            let setter: Setter = Arc::new(move |value: &Value| {
                let backend = bindings.require(target.namespace.as_str())?;
                backend.write(target.backend_request(), &target.body(value.clone()))
            });
            Ok(Node::Bound(BoundLeaf::new(getter, Some(setter))))
        }
    }
}

fn insert(root: &mut Node, slot: &str, leaf: Node) -> std::result::Result<(), ConfigError> {
    let segments = path::split(slot);
    let (name, parents) = segments
        .split_last()
        .ok_or_else(|| ConfigError::Invalid("empty parameter path".into()))?;

    let mut node = root;
    for segment in parents {
        let Node::Branch(branch) = node else {
            return Err(ConfigError::Invalid(format!(
                "'{}' passes through a leaf",
                slot
            )));
        };
        if branch.child(segment).is_none() {
            branch
                .children
                .push((segment.to_string(), Node::Branch(Branch::default())));
        }
        node = branch
            .child_mut(segment)
            .ok_or_else(|| ConfigError::Invalid(slot.to_string()))?;
    }

    let Node::Branch(branch) = node else {
        return Err(ConfigError::Invalid(format!("'{}' passes through a leaf", slot)));
    };
    if branch.child(name).is_some() {
        return Err(ConfigError::Invalid(format!("'{}' declared twice", slot)));
    }
    branch.children.push((name.to_string(), leaf));
    Ok(())
}

fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

fn check(node: &Node, value: &Value, at: &str) -> Result<()> {
    match node {
        Node::Branch(branch) => {
            let fields = value.as_object().ok_or_else(|| BridgeError::InvalidValue {
                path: at.to_string(),
                reason: format!("expected an object, got {}", type_name(value)),
            })?;
            for (name, child_value) in fields {
                let child_path = join(at, name);
                let child = branch
                    .child(name)
                    .ok_or_else(|| BridgeError::PathNotFound(child_path.clone()))?;
                check(child, child_value, &child_path)?;
            }
            Ok(())
        }
        leaf if leaf.is_writable() => Ok(()),
        _ => Err(BridgeError::ReadOnly(at.to_string())),
    }
}

fn apply(node: &Node, value: &Value, at: &str) -> Result<()> {
    match node {
        Node::Branch(branch) => {
            // `check` has already verified every key names a child.
            if let Value::Object(fields) = value {
                for (name, child_value) in fields {
                    if let Some(child) = branch.child(name) {
                        apply(child, child_value, &join(at, name))?;
                    }
                }
            }
            Ok(())
        }
        Node::Bound(BoundLeaf {
            setter: Some(setter),
            ..
        }) => {
            tracing::debug!("set {} = {}", at, value);
            setter(value).map_err(|e| {
                tracing::warn!("Write to {} failed: {}", at, e);
                BridgeError::Backend(with_path(e, at))
            })
        }
        _ => Err(BridgeError::ReadOnly(at.to_string())),
    }
}

/// Prefix a downstream error with the leaf it was raised for.
fn with_path(err: BackendError, at: &str) -> BackendError {
    match err {
        BackendError::Rejected(message) => BackendError::Rejected(format!("{}: {}", at, message)),
        other => other,
    }
}

fn collect_leaves(node: &Node, at: &str, out: &mut Vec<String>) {
    match node {
        Node::Branch(branch) => {
            for (name, child) in &branch.children {
                collect_leaves(child, &join(at, name), out);
            }
        }
        _ => out.push(at.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MockBackend};
    use crate::config::aravis_parameters;

    fn store_with_mock() -> (ParameterStore, Arc<MockBackend>) {
        let bindings = Arc::new(BackendBindings::new());
        let mock = Arc::new(MockBackend::camera());
        bindings.register("fp", mock.clone() as Arc<dyn Backend>);
        let store = ParameterStore::from_specs(&aravis_parameters(), bindings).unwrap();
        (store, mock)
    }

    #[test]
    fn test_tree_shape_follows_schema() {
        let (store, _) = store_with_mock();
        let leaves = store.leaf_paths();
        assert_eq!(leaves.len(), 11);
        assert_eq!(leaves[0], "config/mode");
        assert!(leaves.contains(&"status/frames_captured".to_string()));
        assert_eq!(store.kind("config").unwrap(), "branch");
        assert_eq!(store.kind("status/streaming").unwrap(), "cached");
        assert_eq!(store.kind("config/exposure_time").unwrap(), "bound");
    }

    #[test]
    fn test_get_leaf_with_metadata() {
        let (store, _) = store_with_mock();
        let doc = store.get("config/exposure_time").unwrap();
        assert_eq!(
            doc,
            json!({"exposure_time": {"value": 0.0, "writeable": true, "type": "float"}})
        );

        let doc = store.get("status/camera_id").unwrap();
        assert_eq!(doc["camera_id"]["writeable"], json!(false));
        assert_eq!(doc["camera_id"]["type"], json!("str"));
    }

    #[test]
    fn test_get_branch_and_root() {
        let (store, _) = store_with_mock();
        let doc = store.get("config").unwrap();
        let config = doc["config"].as_object().unwrap();
        assert_eq!(config.len(), 7);
        assert_eq!(config["start_acquisition"]["value"], json!(0));

        let root = store.get("").unwrap();
        assert!(root.get("config").is_some());
        assert!(root.get("status").is_some());
    }

    #[test]
    fn test_get_missing_path() {
        let (store, _) = store_with_mock();
        assert_eq!(
            store.get("config/gain").unwrap_err(),
            BridgeError::PathNotFound("config/gain".into())
        );
        assert_eq!(
            store.get("config/mode/deeper").unwrap_err(),
            BridgeError::PathNotFound("config/mode/deeper".into())
        );
    }

    #[test]
    fn test_set_read_only_leaf_leaves_values_unchanged() {
        let (store, mock) = store_with_mock();
        let before = store.value("").unwrap();
        assert_eq!(
            store.set("status/frames_captured", &json!(99)).unwrap_err(),
            BridgeError::ReadOnly("status/frames_captured".into())
        );
        assert_eq!(
            store.set("config/pixel_format", &json!("Mono16")).unwrap_err(),
            BridgeError::ReadOnly("config/pixel_format".into())
        );
        assert_eq!(store.value("").unwrap(), before);
        assert!(mock.writes().is_empty());
    }

    #[test]
    fn test_set_bound_leaf_writes_downstream_only() {
        let (store, mock) = store_with_mock();
        store.set("config/exposure_time", &json!(12.5)).unwrap();
        assert_eq!(
            mock.writes(),
            vec![("config/aravis".to_string(), json!({"exposure_time": 12.5}))]
        );
        // Reconciliation, not the setter, refreshes the cached value.
        assert_eq!(store.value("config/exposure_time").unwrap(), json!(0.0));
    }

    #[test]
    fn test_set_trigger_leaf() {
        let (store, mock) = store_with_mock();
        store.set("config/start_acquisition", &json!(1)).unwrap();
        assert_eq!(mock.field("status/aravis", "streaming"), Some(json!(true)));
        assert_eq!(store.value("config/start_acquisition").unwrap(), json!(0));
    }

    #[test]
    fn test_set_surfaces_backend_rejection() {
        let (store, _) = store_with_mock();
        let err = store.set("config/exposure_time", &json!(-1.0)).unwrap_err();
        assert!(matches!(err, BridgeError::Backend(BackendError::Rejected(_))));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_set_without_binding_is_not_connected() {
        let store =
            ParameterStore::from_specs(&aravis_parameters(), Arc::new(BackendBindings::new()))
                .unwrap();
        let err = store.set("config/mode", &json!("SingleFrame")).unwrap_err();
        assert_eq!(
            err,
            BridgeError::Backend(BackendError::NotConnected("fp".into()))
        );
    }

    #[test]
    fn test_set_branch_checks_before_writing() {
        let (store, mock) = store_with_mock();

        let err = store
            .set(
                "config",
                &json!({"frame_count": 10, "frame_rate": 5.0}),
            )
            .unwrap_err();
        assert_eq!(err, BridgeError::ReadOnly("config/frame_rate".into()));
        assert!(mock.writes().is_empty());

        let err = store.set("config", &json!(5)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidValue { .. }));

        store
            .set("config", &json!({"frame_count": 10, "mode": "MultiFrame"}))
            .unwrap();
        assert_eq!(mock.writes().len(), 2);
    }

    #[test]
    fn test_constant_leaf_without_setter_is_read_only() {
        let specs = vec![ParameterSpec {
            path: "info/version".into(),
            source: None,
            constant: Some(json!("1.2")),
            write: None,
            initial: Value::Null,
        }];
        let store = ParameterStore::from_specs(&specs, Arc::new(BackendBindings::new())).unwrap();
        assert_eq!(store.value("info/version").unwrap(), json!("1.2"));
        assert!(matches!(
            store.set("info/version", &json!("2.0")),
            Err(BridgeError::ReadOnly(_))
        ));
        assert!(store.sources().is_empty());
    }

    #[test]
    fn test_lookup_with_temporary_path() {
        let (store, _) = store_with_mock();
        let leaf = String::from("mode");
        let doc = store.get(&format!("config/{}", leaf)).unwrap();
        assert_eq!(doc["mode"]["writeable"], json!(true));
        assert_eq!(store.kind(&format!("status/{}", "camera_id")).unwrap(), "cached");
    }

    #[test]
    fn test_set_branch_stops_at_first_rejection() {
        let (store, mock) = store_with_mock();
        let err = store
            .set(
                "config",
                &json!({"exposure_time": 5.0, "frame_count": -1}),
            )
            .unwrap_err();
        assert!(matches!(err, BridgeError::Backend(BackendError::Rejected(_))));
        assert!(err.to_string().contains("config/frame_count"), "{}", err);
        // Children before the rejected one stay written.
        assert_eq!(mock.field("config/aravis", "exposure_time"), Some(json!(5.0)));
        assert_eq!(mock.writes().len(), 1);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(&json!(1)), "int");
        assert_eq!(type_name(&json!(1.5)), "float");
        assert_eq!(type_name(&json!(true)), "bool");
        assert_eq!(type_name(&json!(null)), "null");
        assert_eq!(type_name(&json!([1])), "list");
    }
}
