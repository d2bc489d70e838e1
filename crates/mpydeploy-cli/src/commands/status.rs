//! Status command - check the artifact tree against its version manifest
//!
//! The build pipeline records a version and digest per module in
//! `version.json`. Status re-hashes the tree and reports modules whose
//! content drifted from the record, without touching any device.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use mpydeploy_core::config::Config;
use mpydeploy_core::domain::{VersionManifest, VERSION_MANIFEST_FILE};
use mpydeploy_engine::build_local_manifest;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Artifact directory to check (default: deploy.source_dir from config)
    #[arg(long)]
    source: Option<PathBuf>,
}

impl StatusCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let source = self
            .source
            .clone()
            .unwrap_or_else(|| config.deploy.source_dir.clone());

        let versions = VersionManifest::load(&source.join(VERSION_MANIFEST_FILE))?;
        let local = build_local_manifest(&source, config.deploy.scan_concurrency).await?;

        let mut ok = Vec::new();
        let mut stale = Vec::new();
        let mut missing = Vec::new();

        for (path, version) in versions.versions() {
            match local.get(path) {
                None => missing.push((path.clone(), version.to_string())),
                Some(entry) => {
                    let recorded = versions.digest_for(path);
                    if recorded.is_some() && entry.digest.as_ref() == recorded {
                        ok.push((path.clone(), version.to_string()));
                    } else {
                        stale.push((path.clone(), version.to_string()));
                    }
                }
            }
        }

        let untracked: Vec<_> = local
            .paths()
            .filter(|p| {
                versions.version_for(p).is_none() && p.as_str() != VERSION_MANIFEST_FILE
            })
            .cloned()
            .collect();

        if format.is_json() {
            let as_json = |items: &[(mpydeploy_core::domain::DevicePath, String)]| {
                items
                    .iter()
                    .map(|(p, v)| serde_json::json!({"path": p.as_str(), "version": v}))
                    .collect::<Vec<_>>()
            };
            formatter.print_json(&serde_json::json!({
                "source": source.display().to_string(),
                "ok": as_json(&ok),
                "stale": as_json(&stale),
                "missing": as_json(&missing),
                "untracked": untracked.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            }));
            return Ok(());
        }

        formatter.success(&format!(
            "{} module(s): {} up to date, {} stale, {} missing",
            versions.len(),
            ok.len(),
            stale.len(),
            missing.len()
        ));
        for (path, version) in &stale {
            formatter.info(&format!("stale    {path} (recorded {version})"));
        }
        for (path, version) in &missing {
            formatter.info(&format!("missing  {path} (recorded {version})"));
        }
        for path in &untracked {
            formatter.info(&format!("untracked {path}"));
        }
        Ok(())
    }
}
