//! Deployment pipeline
//!
//! `DeployEngine` holds the transport connection for one run and wires the
//! stages together: scan the local tree, probe the device, diff, and
//! optionally apply. Planning performs no mutation, so a dry run is simply
//! a pipeline that stops after the plan.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use mpydeploy_core::diff::compute_plan;
use mpydeploy_core::domain::{
    ApplyReport, ChangePlan, Manifest, ProtectedFiles, RemoteState, RunId,
};
use mpydeploy_core::ports::IDeviceTransport;

use crate::apply::ApplyEngine;
use crate::{prober, scanner, EngineError};

/// A computed plan together with the state it was computed from.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    /// Identifier assigned to this run
    pub run_id: RunId,
    /// Snapshot of the local artifact tree
    pub local: Manifest,
    /// What the probe learned about the device
    pub remote: RemoteState,
    /// The reconciliation plan
    pub plan: ChangePlan,
}

/// Orchestrates one deployment run over a single device connection.
pub struct DeployEngine {
    transport: Arc<dyn IDeviceTransport>,
    protected: ProtectedFiles,
    source_root: PathBuf,
    scan_concurrency: usize,
}

impl DeployEngine {
    /// Create an engine bound to one transport connection.
    pub fn new(
        transport: Arc<dyn IDeviceTransport>,
        protected: ProtectedFiles,
        source_root: PathBuf,
        scan_concurrency: usize,
    ) -> Self {
        Self {
            transport,
            protected,
            source_root,
            scan_concurrency,
        }
    }

    /// Scan, probe, and diff. No device mutation happens here.
    #[instrument(skip_all, fields(source = %self.source_root.display()))]
    pub async fn plan(&self) -> Result<DeployPlan, EngineError> {
        let run_id = RunId::new();
        info!(run_id = %run_id, transport = %self.transport.describe(), "planning deployment");

        let local =
            scanner::build_local_manifest(&self.source_root, self.scan_concurrency).await?;
        let remote = prober::probe_remote(&self.transport).await?;
        let plan = compute_plan(&local, &remote, &self.protected);

        info!(
            run_id = %run_id,
            local_files = local.len(),
            changes = plan.total_changes(),
            "plan computed"
        );

        Ok(DeployPlan {
            run_id,
            local,
            remote,
            plan,
        })
    }

    /// Execute a previously computed plan.
    pub async fn apply(&self, deploy: &DeployPlan) -> Result<ApplyReport, EngineError> {
        let engine = ApplyEngine::new(
            Arc::clone(&self.transport),
            self.protected.clone(),
            self.source_root.clone(),
        );
        engine.apply(deploy.run_id, &deploy.plan).await
    }
}
