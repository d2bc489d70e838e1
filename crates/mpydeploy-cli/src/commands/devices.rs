//! Devices command - list connected serial devices

use anyhow::Result;
use clap::Args;

use mpydeploy_core::config::Config;
use mpydeploy_transport::discover_devices;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct DevicesCommand {}

impl DevicesCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let devices = discover_devices(&config.serial.mpremote_bin).await?;

        if format.is_json() {
            let list: Vec<serde_json::Value> = devices
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "port": d.port,
                        "description": d.description,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({ "devices": list }));
            return Ok(());
        }

        if devices.is_empty() {
            formatter.warn("No serial devices found");
            return Ok(());
        }

        formatter.success(&format!("{} device(s) found", devices.len()));
        for device in &devices {
            formatter.info(&format!("{}  {}", device.port, device.description));
        }
        Ok(())
    }
}
