// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command implementations.

use crate::client::GatewayClient;
use crate::config::CliConfig;
use crate::value::parse_value;
use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use colored::Colorize;
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;
use tabled::{Table, Tabled};

/// Extra settle time after asking the plugin to connect to a camera.
const CONNECT_SETTLE: Duration = Duration::from_secs(1);

/// Options of the `hdf` command.
#[derive(Debug, Clone, Default)]
pub struct HdfOptions {
    pub start: bool,
    pub stop: bool,
    pub write: bool,
    pub stop_writing: bool,
    pub file: Option<String>,
    pub path: Option<String>,
    pub num: Option<u64>,
}

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "#")]
    index: u64,
    #[tabled(rename = "Camera")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
}

fn last_segment(raw: &str) -> &str {
    raw.trim_matches('/').rsplit('/').next().unwrap_or(raw)
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}

fn print_value(raw: &str, value: &Value) {
    println!("{} = {}", last_segment(raw).yellow(), format_value(value));
}

fn wait_with_message(message: &str, duration: Duration) {
    println!("{} ({} ms)", message.dimmed(), duration.as_millis());
    thread::sleep(duration);
}

/// `arvcli get <path>`
pub fn cmd_get(client: &GatewayClient, raw: &str) -> Result<()> {
    let value = client.get_value(raw)?;
    print_value(raw, &value);
    Ok(())
}

/// `arvcli put <path> <value>`: write, wait one status interval, read back.
pub fn cmd_put(client: &GatewayClient, raw: &str, value: &str) -> Result<()> {
    client.put_value(raw, parse_value(value))?;
    wait_with_message("Waiting for status...", client.status_interval());
    cmd_get(client, raw)
}

/// `arvcli status`
pub fn cmd_status(client: &GatewayClient) -> Result<()> {
    println!("{}", "Frame Processor Status".cyan().bold());
    cmd_get(client, "fp/status")
}

/// `arvcli config`
pub fn cmd_config(client: &GatewayClient) -> Result<()> {
    println!("{}", "Frame Processor Configuration".cyan().bold());
    cmd_get(client, "fp/config")
}

/// `arvcli connect`
pub fn cmd_connect(client: &GatewayClient, address: Option<&str>, list: bool) -> Result<()> {
    if let Some(address) = address {
        client.put_value("fp/config/aravis/ip_address", json!(address))?;
        wait_with_message(
            "Waiting for camera...",
            client.status_interval() + CONNECT_SETTLE,
        );
        let model = client.get_value("fp/config/aravis/camera_model")?;
        println!("{} {}", "Connected to camera:".yellow(), format_value(&model));
    }

    if list {
        let status = client.get_value("fp/status/aravis")?;
        let rows = camera_rows(&status);
        if rows.is_empty() {
            println!("  {}", "No cameras detected".yellow());
        } else {
            println!("{}", Table::new(rows));
        }
    }
    Ok(())
}

fn camera_rows(status: &Value) -> Vec<CameraRow> {
    let count = status["connected_devices"].as_u64().unwrap_or(0);
    (0..count)
        .map(|i| CameraRow {
            index: i,
            id: format_value(&status[format!("camera_{}_id", i)]),
            address: format_value(&status[format!("camera_{}_address", i)]),
        })
        .collect()
}

fn frame_period(client: &GatewayClient) -> Result<Duration> {
    let fps = client
        .get_value("aravis/config/frame_rate")?
        .as_f64()
        .unwrap_or(0.0);
    if fps <= 0.0 {
        bail!("camera reports a frame rate of {}", fps);
    }
    Ok(Duration::from_secs_f64(1.0 / fps))
}

fn acquire(client: &GatewayClient, frames: u64) -> Result<()> {
    let period = frame_period(client)?;
    client.put_value("aravis/config/frame_count", json!(frames))?;
    client.put_value("aravis/config/start_acquisition", json!(1))?;
    let periods = u32::try_from(frames).unwrap_or(u32::MAX).saturating_add(1);
    wait_with_message("Acquiring...", period.saturating_mul(periods));
    let acquired = client.get_value("aravis/status/frames_captured")?;
    println!("Acquired {} frames", format_value(&acquired));
    Ok(())
}

/// `arvcli stream`
pub fn cmd_stream(
    client: &GatewayClient,
    start: bool,
    stop: bool,
    capture: Option<u64>,
) -> Result<()> {
    if start {
        println!("{}", "Video starting".green());
        client.put_value("aravis/config/start_acquisition", json!(1))?;
    }
    if stop {
        println!("{}", "Video stopping".red());
        client.put_value("aravis/config/stop_acquisition", json!(1))?;
    }
    if let Some(frames) = capture {
        acquire(client, frames)?;
    }
    Ok(())
}

/// Default file name: `run_<sec>s<min>m<hour>h<day>d<month>m<year>y`.
pub fn default_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!(
        "run_{}s{}m{}h{}d{}m{}y",
        now.second(),
        now.minute(),
        now.hour(),
        now.day(),
        now.month(),
        now.year()
    )
}

/// Body for `fp/config/hdf`.
pub fn hdf_params(frames: u64, name: &str, path: &str, write: Option<bool>) -> Value {
    let mut params = json!({
        "process": {"number": 1, "rank": 0},
        "master": "data",
        "acquisition_id": "",
        "frames": frames,
        "file": {"extension": "h5", "name": name, "path": path},
    });
    if let Some(write) = write {
        params["write"] = json!(write);
    }
    params
}

/// `arvcli hdf`
pub fn cmd_hdf(client: &GatewayClient, config: &CliConfig, opts: &HdfOptions) -> Result<()> {
    if opts.stop_writing || opts.stop {
        client.put_value("fp/config/hdf/write", json!(false))?;
        if opts.stop_writing {
            println!("{} {}", "File writing has".green(), "stopped".red());
            client.put_value("aravis/config/stop_acquisition", json!(1))?;
            println!("{}", "Video stopping".red());
        } else {
            println!("{} {}", "File writing was".green(), "stopped".red());
        }
        return Ok(());
    }

    let frames = match opts.num {
        Some(num) => num,
        None => match client.get_value("fp/config/hdf/frames")?.as_u64() {
            Some(previous) if previous > 0 => {
                println!(
                    "{}",
                    format!("Number of frames unspecified, using previous value {}", previous)
                        .yellow()
                );
                previous
            }
            _ => {
                println!(
                    "{}",
                    format!(
                        "Number of frames unspecified, using default {}",
                        config.default_n_frames
                    )
                    .yellow()
                );
                config.default_n_frames
            }
        },
    };

    let name = match &opts.file {
        Some(name) => name.clone(),
        None => {
            let name = default_file_name(&Local::now());
            println!(
                "{} {}",
                "File name unspecified, using:".yellow(),
                name.yellow().bold()
            );
            name
        }
    };

    let path = match &opts.path {
        Some(path) => path.clone(),
        None => {
            let previous = client.get_value("fp/config/hdf/file/path")?;
            match previous.as_str() {
                Some(previous) if !previous.is_empty() => {
                    println!(
                        "{} {}",
                        "File path unspecified, using previous:".yellow(),
                        previous.yellow().bold()
                    );
                    previous.to_string()
                }
                _ => {
                    println!(
                        "{} {}",
                        "File path unspecified, using default:".yellow(),
                        config.default_path.yellow().bold()
                    );
                    config.default_path.clone()
                }
            }
        }
    };

    let arm = opts.start || opts.write;
    let params = hdf_params(frames, &name, &path, arm.then_some(true));
    client.put_document("/api/0.1/fp/config/hdf", &params)?;

    if opts.write {
        println!("{}", "File writing has started".green());
        acquire(client, frames)?;
    } else if opts.start {
        println!("{}", "File writing has been armed".green());
    } else {
        println!(
            "{} frames={}, file={}, path={}",
            "The following parameters were set:".blue(),
            frames,
            name,
            path
        );
    }
    Ok(())
}

/// `arvcli http`: raw requests against full URL paths.
pub fn cmd_http(
    client: &GatewayClient,
    get: Option<&str>,
    put: Option<&str>,
    value: Option<&str>,
) -> Result<()> {
    if let Some(request) = put {
        let body = value.map(parse_value).unwrap_or_else(|| json!(1));
        let reply = client.put_document(request, &body)?;
        println!("{}", format_value(&reply));
    }
    if let Some(request) = get {
        let reply = client.get_document(request)?;
        println!("{}", format_value(&reply));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_default_file_name() {
        let when = Utc.with_ymd_and_hms(2026, 3, 7, 14, 5, 9).unwrap();
        assert_eq!(default_file_name(&when), "run_9s5m14h7d3m2026y");
    }

    #[test]
    fn test_hdf_params() {
        let params = hdf_params(50, "run1", "/data", Some(true));
        assert_eq!(params["frames"], json!(50));
        assert_eq!(params["file"], json!({"extension": "h5", "name": "run1", "path": "/data"}));
        assert_eq!(params["process"], json!({"number": 1, "rank": 0}));
        assert_eq!(params["write"], json!(true));
        assert!(hdf_params(1, "a", "b", None).get("write").is_none());
    }

    #[test]
    fn test_camera_rows() {
        let status = json!({
            "connected_devices": 2,
            "camera_0_id": "cam-a",
            "camera_0_address": "10.0.0.1",
            "camera_1_id": "cam-b",
            "camera_1_address": "10.0.0.2"
        });
        let rows = camera_rows(&status);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, "cam-b");
        assert_eq!(rows[1].address, "10.0.0.2");
        assert!(camera_rows(&json!({})).is_empty());
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("fp/config/hdf/frames"), "frames");
        assert_eq!(last_segment("/sys/"), "sys");
    }
}
