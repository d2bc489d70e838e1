//! Deploy command - reconcile the artifact tree with a device
//!
//! Plans first, prints the summary, then applies unless `--dry-run` was
//! given. The process exits non-zero when the apply only partially
//! succeeded so CI pipelines notice.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use mpydeploy_core::config::Config;
use mpydeploy_core::domain::RunState;
use mpydeploy_core::ports::IDeviceTransport;
use mpydeploy_engine::{render_plan, DeployEngine};
use mpydeploy_transport::{auto_select, discover_devices, MpremoteTransport, WebreplTransport};

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct DeployCommand {
    /// Artifact directory to deploy (default: deploy.source_dir from config)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Serial device port (default: auto-discover)
    #[arg(long)]
    device: Option<String>,

    /// Use the WebREPL transport instead of serial
    #[arg(long)]
    webrepl: bool,

    /// WebREPL host (default: webrepl.host from config)
    #[arg(long, requires = "webrepl")]
    webrepl_host: Option<String>,

    /// WebREPL port (default: webrepl.port from config)
    #[arg(long, requires = "webrepl")]
    webrepl_port: Option<u16>,

    /// WebREPL password (default: webrepl.password from config)
    #[arg(long, requires = "webrepl")]
    webrepl_password: Option<String>,

    /// Compute and print the plan without touching the device
    #[arg(long)]
    dry_run: bool,
}

impl DeployCommand {
    /// Build the transport this run will use.
    async fn build_transport(&self, config: &Config) -> Result<Arc<dyn IDeviceTransport>> {
        if self.webrepl {
            let host = self
                .webrepl_host
                .clone()
                .unwrap_or_else(|| config.webrepl.host.clone());
            let port = self.webrepl_port.unwrap_or(config.webrepl.port);
            let password = self
                .webrepl_password
                .clone()
                .or_else(|| config.webrepl.password.clone());
            return Ok(Arc::new(WebreplTransport::new(
                config.webrepl.client_bin.clone(),
                host,
                port,
                password,
            )));
        }

        let explicit = self.device.clone().or_else(|| config.serial.device.clone());
        let port = match explicit {
            Some(port) => port,
            None => {
                let discovered = discover_devices(&config.serial.mpremote_bin)
                    .await
                    .context("Device discovery failed")?;
                auto_select(None, &discovered)?
            }
        };
        Ok(Arc::new(MpremoteTransport::new(
            config.serial.mpremote_bin.clone(),
            port,
        )))
    }

    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let source = self
            .source
            .clone()
            .unwrap_or_else(|| config.deploy.source_dir.clone());

        let transport = self.build_transport(config).await?;
        info!(transport = %transport.describe(), source = %source.display(), "starting deploy");

        let engine = DeployEngine::new(
            Arc::clone(&transport),
            config.protected_files(),
            source,
            config.deploy.scan_concurrency,
        );

        let deploy = engine.plan().await?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "run_id": deploy.run_id.to_string(),
                "transport": transport.describe(),
                "remote_known": deploy.remote.is_known(),
                "local_files": deploy.local.len(),
                "plan": deploy.plan,
                "dry_run": self.dry_run,
            }));
        } else {
            for line in render_plan(&deploy.plan, &deploy.remote).lines() {
                formatter.info(line);
            }
        }

        if self.dry_run {
            if !format.is_json() {
                formatter.success("Dry run complete, device untouched");
            }
            return Ok(());
        }

        if deploy.plan.is_empty() {
            formatter.success("Nothing to deploy");
            return Ok(());
        }

        let report = engine.apply(&deploy).await?;

        if format.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
        } else {
            match report.state {
                RunState::Completed => {
                    formatter.success(&format!(
                        "Deployed {} change(s), device restarted",
                        report.completed.len()
                    ));
                }
                _ => {
                    formatter.error(&format!(
                        "{} operation(s) completed, {} failed, {} not attempted",
                        report.completed.len(),
                        report.failed.len(),
                        report.not_attempted.len()
                    ));
                    for failure in &report.failed {
                        formatter.info(&format!("failed: {} ({})", failure.operation, failure.message));
                    }
                }
            }
        }

        if !report.is_success() {
            anyhow::bail!("Deployment partially failed");
        }
        Ok(())
    }
}
