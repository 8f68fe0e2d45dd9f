// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Aravis parameter bridge
//!
//! Keeps a locally cached parameter tree consistent with a frame processor
//! plugin that is slow, asynchronous and occasionally unavailable, and
//! translates human-typed paths into backend requests.
//!
//! # Features
//!
//! - **Path translation**: one resolver shared by the bridge and `arvcli`
//! - **Parameter tree**: cached leaves and getter/setter bindings from a
//!   static schema
//! - **Reconciliation**: background poll with whole-snapshot swaps
//! - **HTTP adapter**: `/api/0.1/{aravis,fp,sys}/...`
//!
//! # Quick Start
//!
//! ```bash
//! # Simulated camera on port 8888
//! arv-bridge --simulate
//!
//! # Read and write through the bridge
//! arvcli get aravis/config/exposure_time
//! arvcli put aravis/config/exposure_time 12.5
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! name = "lab-camera"
//! port = 8888
//! poll_interval_ms = 200
//!
//! [backend]
//! endpoint = "http://127.0.0.1:8888/api/0.1/fp"
//!
//! [[parameters]]
//! path = "config/exposure_time"
//! source = "fp/config/aravis/exposure_time"
//! write = "fp/config/aravis/exposure_time"
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod path;
pub mod reconcile;
pub mod server;
pub mod snapshot;
pub mod store;

pub use backend::{Backend, BackendBindings, HttpBackend, MockBackend};
pub use config::{aravis_parameters, BridgeConfig, ConfigError, LeafKind, ParameterSpec};
pub use error::{BackendError, BridgeError, Result};
pub use gateway::ControlGateway;
pub use path::{resolve, resolve_put, Key, Namespace, PutTarget, Resolved, API_PREFIX};
pub use reconcile::{CycleOutcome, LoopState, ReconcileStatsSnapshot, Reconciler};
pub use snapshot::{Snapshot, SnapshotCell};
pub use store::{Node, ParameterStore};
