// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Aravis bridge CLI
//!
//! # Usage
//!
//! ```bash
//! # Read a parameter
//! arvcli get aravis/config/exposure_time
//!
//! # Write a parameter and read it back after one status interval
//! arvcli put fp/config/aravis/frame_rate 10
//!
//! # Connect to a camera and list what the plugin sees
//! arvcli connect --address 10.0.0.12 --list
//!
//! # Arm the file writer and capture 50 frames
//! arvcli hdf --write --num 50 --file run1 --path /data
//! ```

use arvcli::commands::{
    cmd_config, cmd_connect, cmd_get, cmd_hdf, cmd_http, cmd_put, cmd_status, cmd_stream,
    HdfOptions,
};
use arvcli::{CliConfig, GatewayClient};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

/// Aravis bridge CLI
#[derive(Parser, Debug)]
#[command(name = "arvcli")]
#[command(about = "Control an Aravis camera through the odin bridge")]
#[command(version)]
struct Args {
    /// Bridge host (overrides the config file)
    #[arg(short, long)]
    ip: Option<String>,

    /// Bridge port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// YAML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a parameter (fp/..., aravis/..., sys/...)
    Get {
        /// Parameter path
        path: String,
    },

    /// Write a parameter, then read it back
    Put {
        /// Parameter path
        path: String,
        /// New value (numbers, booleans and JSON are parsed)
        value: String,
    },

    /// Show frame processor status
    Status,

    /// Show frame processor configuration
    Config,

    /// Connect to a camera or list detected cameras
    Connect {
        /// Camera address to connect to
        #[arg(short = 'a', long)]
        address: Option<String>,

        /// List cameras detected by the plugin
        #[arg(short, long)]
        list: bool,
    },

    /// Start, stop or capture a fixed number of frames
    Stream {
        /// Start acquisition
        #[arg(long)]
        start: bool,

        /// Stop acquisition
        #[arg(long)]
        stop: bool,

        /// Capture this many frames, then report the count
        #[arg(long, value_name = "FRAMES")]
        capture: Option<u64>,
    },

    /// Configure and drive the HDF5 file writer
    Hdf {
        /// Arm the writer without starting acquisition
        #[arg(long)]
        start: bool,

        /// Stop the writer
        #[arg(long)]
        stop: bool,

        /// Arm the writer and capture `--num` frames
        #[arg(long)]
        write: bool,

        /// Stop the writer and the acquisition
        #[arg(long = "stop-writing", alias = "stopW")]
        stop_writing: bool,

        /// File name
        #[arg(short, long)]
        file: Option<String>,

        /// Output directory
        #[arg(long)]
        path: Option<String>,

        /// Frames to write
        #[arg(short, long)]
        num: Option<u64>,
    },

    /// Raw requests against full URL paths (/api/0.1/...)
    Http {
        /// GET this path and print the document
        #[arg(long)]
        get: Option<String>,

        /// PUT to this path
        #[arg(long)]
        put: Option<String>,

        /// Body for --put (default 1)
        #[arg(long, requires = "put")]
        value: Option<String>,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = CliConfig::load(args.config.as_deref(), args.ip, args.port)?;
    let client = GatewayClient::new(config.base_url())?;

    match args.command {
        Commands::Get { path } => cmd_get(&client, &path),
        Commands::Put { path, value } => cmd_put(&client, &path, &value),
        Commands::Status => cmd_status(&client),
        Commands::Config => cmd_config(&client),
        Commands::Connect { address, list } => cmd_connect(&client, address.as_deref(), list),
        Commands::Stream {
            start,
            stop,
            capture,
        } => cmd_stream(&client, start, stop, capture),
        Commands::Hdf {
            start,
            stop,
            write,
            stop_writing,
            file,
            path,
            num,
        } => {
            let opts = HdfOptions {
                start,
                stop,
                write,
                stop_writing,
                file,
                path,
                num,
            };
            cmd_hdf(&client, &config, &opts)
        }
        Commands::Http { get, put, value } => {
            cmd_http(&client, get.as_deref(), put.as_deref(), value.as_deref())
        }
    }
}
