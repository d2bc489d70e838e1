//! Serial device discovery
//!
//! Enumerates connected boards via `mpremote connect list` and implements
//! the selection policy: an explicitly configured port always wins, a
//! single discovered device is chosen automatically, and anything else is
//! an error naming the candidates.

use std::process::Stdio;

use anyhow::{bail, Context};
use tokio::process::Command;
use tracing::{debug, instrument};

use mpydeploy_core::ports::DeviceInfo;

/// Parse the output of `mpremote connect list`.
///
/// Each line is `<port> <serial> <vid:pid> <manufacturer> <product>`; only
/// lines whose first token looks like a serial port are kept.
pub fn parse_connect_list(output: &str) -> Vec<DeviceInfo> {
    let mut devices = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((port, rest)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        if !is_serial_port(port) {
            continue;
        }
        devices.push(DeviceInfo {
            port: port.to_string(),
            description: rest.trim().to_string(),
        });
    }
    devices
}

fn is_serial_port(port: &str) -> bool {
    port.starts_with("/dev/tty") || port.starts_with("/dev/cu.") || port.starts_with("COM")
}

/// List boards currently visible to mpremote.
#[instrument(skip_all)]
pub async fn discover_devices(mpremote_bin: &str) -> anyhow::Result<Vec<DeviceInfo>> {
    let output = Command::new(mpremote_bin)
        .arg("connect")
        .arg("list")
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to spawn {mpremote_bin}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("mpremote connect list failed: {}", stderr.trim());
    }

    let devices = parse_connect_list(&String::from_utf8_lossy(&output.stdout));
    debug!(count = devices.len(), "devices discovered");
    Ok(devices)
}

/// Pick the serial port to use for a run.
///
/// An explicit port short-circuits discovery entirely, so deploys to a
/// detached device path fail at connect time rather than here.
pub fn auto_select(explicit: Option<&str>, discovered: &[DeviceInfo]) -> anyhow::Result<String> {
    if let Some(port) = explicit {
        return Ok(port.to_string());
    }

    match discovered {
        [] => bail!("No serial devices found; pass a device port explicitly"),
        [only] => Ok(only.port.clone()),
        many => {
            let candidates: Vec<String> = many
                .iter()
                .map(|d| format!("{} ({})", d.port, d.description))
                .collect();
            bail!(
                "Multiple serial devices found, pass one explicitly:\n  {}",
                candidates.join("\n  ")
            )
        }
    }
}
