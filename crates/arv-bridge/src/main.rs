// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Aravis bridge host
//!
//! Serves the `aravis`, `fp` and `sys` namespaces over HTTP and keeps the
//! `aravis` parameter tree reconciled with the frame processor.
//!
//! # Usage
//!
//! ```bash
//! # Bridge a running frame processor control API
//! arv-bridge --fp-endpoint http://127.0.0.1:8888/api/0.1/fp --port 8889
//!
//! # Simulated camera, no hardware
//! arv-bridge --simulate
//!
//! # Using configuration file
//! arv-bridge --config bridge.toml
//! ```

use arv_bridge::{server, BridgeConfig, ControlGateway, HttpBackend, MockBackend};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Aravis parameter bridge
#[derive(Parser, Debug)]
#[command(name = "arv-bridge")]
#[command(about = "Aravis camera parameter bridge for the frame processor control API")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// HTTP server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Frame processor control API base URL
    #[arg(long, conflicts_with = "simulate")]
    fp_endpoint: Option<String>,

    /// Serve a simulated camera instead of a real frame processor
    #[arg(long)]
    simulate: bool,

    /// Reconciliation interval (milliseconds)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "bridge.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(cmd) = args.command {
        return match cmd {
            Commands::GenConfig { output } => cmd_gen_config(output),
            Commands::Validate { config } => cmd_validate(config),
        };
    }

    let config = build_config(&args)?;

    // Initialize logging
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let gateway = Arc::new(ControlGateway::start(config.clone())?);

    // Backends own blocking HTTP clients; create them outside the runtime.
    if args.simulate {
        tracing::info!("Simulated frame processor enabled");
        gateway.register_backend("fp", Arc::new(MockBackend::camera()));
    } else if let Some(endpoint) = &config.backend.endpoint {
        tracing::info!("Frame processor: {}", endpoint);
        let backend = HttpBackend::new(endpoint.as_str(), config.backend.timeout())?;
        gateway.register_backend("fp", Arc::new(backend));
    } else {
        tracing::warn!("No frame processor endpoint; fp stays disconnected");
    }

    let addr = format!("{}:{}", config.bind, config.port);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Aravis bridge v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("HTTP server: http://{}/api/0.1", addr);

        server::serve(gateway.clone(), listener, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down...");
            }
        })
        .await
    })?;

    gateway.shutdown();

    let stats = gateway.reconcile_stats();
    println!(
        "Reconciliation: {} applied, {} failed, {} skipped",
        stats.cycles_applied, stats.cycles_failed, stats.cycles_skipped
    );

    Ok(())
}

fn build_config(args: &Args) -> Result<BridgeConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(endpoint) = &args.fp_endpoint {
        config.backend.endpoint = Some(endpoint.clone());
    }
    if let Some(interval) = args.poll_interval_ms {
        config.poll_interval_ms = interval;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = BridgeConfig {
        name: "aravis-bridge".into(),
        ..Default::default()
    };
    config.backend.endpoint = Some("http://127.0.0.1:8888/api/0.1/fp".into());

    let toml_str = toml::to_string_pretty(&config)?;

    let content = format!(
        r#"# Aravis Bridge Configuration
# Generated by arv-bridge gen-config
#
# Each [[parameters]] entry is one leaf of the `aravis` tree:
#   source   = fp path the value is reconciled from
#   write    = fp path written when the leaf is set
#   constant = fixed value (trigger leaves)

{}
"#,
        toml_str
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match BridgeConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Bridge: {}", config.name);
            println!(
                "Endpoint: {}",
                config.backend.endpoint.as_deref().unwrap_or("(none)")
            );
            println!("Parameters: {}", config.parameters.len());
            for param in &config.parameters {
                let access = match param.kind() {
                    arv_bridge::LeafKind::Cached => "ro",
                    arv_bridge::LeafKind::Bound { writable: true } => "rw",
                    arv_bridge::LeafKind::Bound { writable: false } => "const",
                };
                println!("  {:<28} {:<5} {}", param.path, access, describe(param));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

fn describe(param: &arv_bridge::ParameterSpec) -> String {
    match (&param.source, &param.write, &param.constant) {
        (Some(source), Some(write), _) if source == write => source.clone(),
        (Some(source), Some(write), _) => format!("{} -> {}", source, write),
        (Some(source), None, _) => source.clone(),
        (None, Some(write), _) => format!("-> {}", write),
        (None, None, Some(constant)) => constant.to_string(),
        (None, None, None) => String::new(),
    }
}
