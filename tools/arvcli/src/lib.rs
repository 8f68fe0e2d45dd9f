// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Operator CLI for the Aravis bridge.
//!
//! Every command is a thin sequence of `get` / `put` calls against the
//! bridge's HTTP surface; parameter paths are resolved with the bridge's
//! own resolver so both sides agree on envelopes.

pub mod client;
pub mod commands;
pub mod config;
pub mod value;

pub use client::GatewayClient;
pub use commands::HdfOptions;
pub use config::CliConfig;
pub use value::parse_value;
