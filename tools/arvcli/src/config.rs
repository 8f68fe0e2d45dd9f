// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CLI settings.
//!
//! ```yaml
//! server: 127.0.0.1
//! port: 8888
//! default_n_frames: 100
//! default_path: /tmp
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings passed to every command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Bridge host.
    #[serde(default = "default_server", alias = "ip")]
    pub server: String,

    /// Bridge port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Frames per file when `hdf` is not told and the writer has none.
    #[serde(default = "default_n_frames")]
    pub default_n_frames: u64,

    /// Output directory when `hdf` is not told and the writer has none.
    #[serde(default = "default_path")]
    pub default_path: String,
}

fn default_server() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_n_frames() -> u64 {
    100
}

fn default_path() -> String {
    "/tmp".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            port: default_port(),
            default_n_frames: default_n_frames(),
            default_path: default_path(),
        }
    }
}

impl CliConfig {
    /// Load settings from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// File settings (or defaults) with command-line overrides applied.
    pub fn load(path: Option<&Path>, server: Option<String>, port: Option<u16>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(server) = server {
            config.server = server;
        }
        if let Some(port) = port {
            config.port = port;
        }
        Ok(config)
    }

    /// `http://<server>:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CliConfig::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:8888");
        assert_eq!(config.default_n_frames, 100);
    }

    #[test]
    fn test_load_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "ip: 10.0.0.5\nport: 9000\ndefault_n_frames: 20\ndefault_path: /data"
        )
        .expect("write");

        let config = CliConfig::load(Some(file.path()), None, None).unwrap();
        assert_eq!(config.server, "10.0.0.5");
        assert_eq!(config.port, 9000);
        assert_eq!(config.default_path, "/data");

        let config = CliConfig::load(Some(file.path()), Some("localhost".into()), Some(1)).unwrap();
        assert_eq!(config.base_url(), "http://localhost:1");
        assert_eq!(config.default_n_frames, 20);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(CliConfig::load(Some(Path::new("/nonexistent/arvcli.yaml")), None, None).is_err());
    }
}
