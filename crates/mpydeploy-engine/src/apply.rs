//! Apply engine
//!
//! Executes a change plan against the device, in a fixed order:
//! directories first, then deletes, then copies, then exactly one restart.
//! Deletes run before copies so the device never holds stale modules next
//! to their replacements longer than necessary.
//!
//! There is no rollback. The first failed operation aborts the remaining
//! sequence and the restart; everything that did not run is reported as
//! not attempted. A re-run re-diffs against whatever state the device was
//! left in, so a partial apply self-heals.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use mpydeploy_core::domain::{
    ApplyReport, ChangePlan, DevicePath, Operation, OperationFailure, ProtectedFiles, RunId,
    RunState,
};
use mpydeploy_core::ports::{IDeviceTransport, TransportCapability};

use crate::EngineError;

/// Executes change plans over a device transport.
pub struct ApplyEngine {
    transport: Arc<dyn IDeviceTransport>,
    protected: ProtectedFiles,
    source_root: PathBuf,
}

impl ApplyEngine {
    /// Create an apply engine.
    ///
    /// `source_root` is the local directory copy sources are resolved
    /// against.
    pub fn new(
        transport: Arc<dyn IDeviceTransport>,
        protected: ProtectedFiles,
        source_root: PathBuf,
    ) -> Self {
        Self {
            transport,
            protected,
            source_root,
        }
    }

    /// Build the ordered operation sequence for a plan.
    ///
    /// Opaque transports have no directory interface; their copy tool
    /// handles paths as given, so the mkdir phase is omitted.
    fn operations(&self, plan: &ChangePlan) -> (Vec<Operation>, Vec<DevicePath>) {
        let mut ops = Vec::new();
        let mut skipped = Vec::new();

        if self.transport.capability() == TransportCapability::Introspectable {
            for dir in plan.required_dirs() {
                ops.push(Operation::MakeDir(dir));
            }
        }

        for path in plan.executable_deletes() {
            // Last line of defense: the diff already filtered protected
            // paths, but a plan can arrive from anywhere.
            if self.protected.is_protected(path) {
                info!(path = %path, "protected file retained on device");
                skipped.push(path.clone());
            } else {
                ops.push(Operation::Delete(path.clone()));
            }
        }

        for path in plan.copy_targets() {
            ops.push(Operation::Copy(path.clone()));
        }

        (ops, skipped)
    }

    async fn execute(&self, op: &Operation) -> anyhow::Result<()> {
        match op {
            Operation::MakeDir(path) => self.transport.make_dir(path).await,
            Operation::Delete(path) => self.transport.delete_file(path).await,
            Operation::Copy(path) => {
                let local = self.source_root.join(path.as_str());
                self.transport.copy_file(&local, path).await
            }
            Operation::Restart => self.transport.restart().await,
        }
    }

    /// Execute the plan and account for every operation.
    #[instrument(skip_all, fields(run_id = %run_id, changes = plan.total_changes()))]
    pub async fn apply(
        &self,
        run_id: RunId,
        plan: &ChangePlan,
    ) -> Result<ApplyReport, EngineError> {
        let started_at = Utc::now();
        let mut state = RunState::Planned.transition(RunState::Applying)?;

        let (ops, mut skipped_protected) = self.operations(plan);
        skipped_protected.extend(plan.to_skip_delete.iter().cloned());
        skipped_protected.sort();
        skipped_protected.dedup();

        let mut completed = Vec::new();
        let mut failed: Vec<OperationFailure> = Vec::new();
        let mut not_attempted = Vec::new();
        let mut restarted = false;

        let mut ops = ops.into_iter();
        for op in ops.by_ref() {
            debug!(operation = %op, "executing");
            match self.execute(&op).await {
                Ok(()) => completed.push(op),
                Err(e) => {
                    warn!(operation = %op, error = %e, "operation failed, aborting run");
                    failed.push(OperationFailure::new(op, e.to_string()));
                    break;
                }
            }
        }
        not_attempted.extend(ops);

        if failed.is_empty() {
            // Restart only after a fully successful apply.
            match self.execute(&Operation::Restart).await {
                Ok(()) => {
                    restarted = true;
                    completed.push(Operation::Restart);
                }
                Err(e) => {
                    warn!(error = %e, "device restart failed");
                    failed.push(OperationFailure::new(Operation::Restart, e.to_string()));
                }
            }
        }

        state = if failed.is_empty() {
            state.transition(RunState::Completed)?
        } else {
            state.transition(RunState::PartiallyFailed)?
        };

        info!(
            state = %state,
            completed = completed.len(),
            failed = failed.len(),
            not_attempted = not_attempted.len(),
            "apply finished"
        );

        Ok(ApplyReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            state,
            completed,
            failed,
            not_attempted,
            skipped_protected,
            restarted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use mpydeploy_core::domain::{ContentDigest, DevicePath};

    fn path(s: &str) -> DevicePath {
        DevicePath::new(s).unwrap()
    }

    /// In-memory transport that records every call and can be told to fail
    /// on a specific operation.
    struct FakeTransport {
        capability: TransportCapability,
        log: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl FakeTransport {
        fn new(capability: TransportCapability) -> Self {
            Self {
                capability,
                log: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(capability: TransportCapability, op: &str) -> Self {
            Self {
                fail_on: Some(op.to_string()),
                ..Self::new(capability)
            }
        }

        fn record(&self, call: String) -> anyhow::Result<()> {
            if self.fail_on.as_deref() == Some(call.as_str()) {
                anyhow::bail!("injected failure: {call}");
            }
            self.log.lock().unwrap().push(call);
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl IDeviceTransport for FakeTransport {
        fn capability(&self) -> TransportCapability {
            self.capability
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }

        async fn check_reachable(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn list_files(&self) -> anyhow::Result<Vec<DevicePath>> {
            Ok(Vec::new())
        }

        async fn hash_file(&self, _path: &DevicePath) -> anyhow::Result<Option<ContentDigest>> {
            Ok(None)
        }

        async fn make_dir(&self, path: &DevicePath) -> anyhow::Result<()> {
            self.record(format!("mkdir {path}"))
        }

        async fn copy_file(&self, _local: &Path, remote: &DevicePath) -> anyhow::Result<()> {
            self.record(format!("copy {remote}"))
        }

        async fn delete_file(&self, path: &DevicePath) -> anyhow::Result<()> {
            self.record(format!("delete {path}"))
        }

        async fn restart(&self) -> anyhow::Result<()> {
            self.record("restart".to_string())
        }
    }

    fn engine(transport: Arc<FakeTransport>) -> ApplyEngine {
        ApplyEngine::new(transport, ProtectedFiles::default(), PathBuf::from("/src"))
    }

    #[tokio::test]
    async fn test_full_success_ordering() {
        let transport = Arc::new(FakeTransport::new(TransportCapability::Introspectable));
        let eng = engine(Arc::clone(&transport));

        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("lib/new.py"));
        plan.to_update.insert(path("main.py"));
        plan.to_delete.insert(path("old.py"));

        let report = eng.apply(RunId::new(), &plan).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert!(report.restarted);
        assert_eq!(
            transport.calls(),
            vec![
                "mkdir lib",
                "delete old.py",
                "copy lib/new.py",
                "copy main.py",
                "restart",
            ]
        );
    }

    #[tokio::test]
    async fn test_mkdir_parents_before_children() {
        let transport = Arc::new(FakeTransport::new(TransportCapability::Introspectable));
        let eng = engine(Arc::clone(&transport));

        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("lib/drivers/pump.mpy"));

        eng.apply(RunId::new(), &plan).await.unwrap();

        let calls = transport.calls();
        let lib = calls.iter().position(|c| c == "mkdir lib").unwrap();
        let drivers = calls.iter().position(|c| c == "mkdir lib/drivers").unwrap();
        assert!(lib < drivers);
    }

    #[tokio::test]
    async fn test_partial_failure_accounting() {
        // Three adds, the second copy fails: one succeeded, one failed,
        // one never attempted, and the device is not restarted.
        let transport = Arc::new(FakeTransport::failing_on(
            TransportCapability::Introspectable,
            "copy b.py",
        ));
        let eng = engine(Arc::clone(&transport));

        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("a.py"));
        plan.to_add.insert(path("b.py"));
        plan.to_add.insert(path("c.py"));

        let report = eng.apply(RunId::new(), &plan).await.unwrap();

        assert_eq!(report.state, RunState::PartiallyFailed);
        assert_eq!(report.completed, vec![Operation::Copy(path("a.py"))]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].operation, Operation::Copy(path("b.py")));
        assert_eq!(report.not_attempted, vec![Operation::Copy(path("c.py"))]);
        assert!(!report.restarted);
        assert!(!transport.calls().contains(&"restart".to_string()));
    }

    #[tokio::test]
    async fn test_protected_delete_is_refused_even_in_plan() {
        // A plan that somehow carries a protected path in its delete set
        // still must not delete it.
        let transport = Arc::new(FakeTransport::new(TransportCapability::Introspectable));
        let eng = engine(Arc::clone(&transport));

        let mut plan = ChangePlan::new();
        plan.to_delete.insert(path("webrepl_cfg.py"));
        plan.to_delete.insert(path("old.py"));

        let report = eng.apply(RunId::new(), &plan).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.skipped_protected, vec![path("webrepl_cfg.py")]);
        assert!(!transport
            .calls()
            .contains(&"delete webrepl_cfg.py".to_string()));
        assert!(transport.calls().contains(&"delete old.py".to_string()));
    }

    #[tokio::test]
    async fn test_empty_plan_still_restarts_once() {
        let transport = Arc::new(FakeTransport::new(TransportCapability::Introspectable));
        let eng = engine(Arc::clone(&transport));

        let report = eng.apply(RunId::new(), &ChangePlan::new()).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert!(report.restarted);
        assert_eq!(transport.calls(), vec!["restart"]);
    }

    #[tokio::test]
    async fn test_restart_failure_marks_run_failed() {
        let transport = Arc::new(FakeTransport::failing_on(
            TransportCapability::Introspectable,
            "restart",
        ));
        let eng = engine(Arc::clone(&transport));

        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("a.py"));

        let report = eng.apply(RunId::new(), &plan).await.unwrap();

        assert_eq!(report.state, RunState::PartiallyFailed);
        assert!(!report.restarted);
        assert_eq!(report.failed[0].operation, Operation::Restart);
        // The copy itself did succeed.
        assert_eq!(report.completed, vec![Operation::Copy(path("a.py"))]);
    }

    #[tokio::test]
    async fn test_opaque_transport_skips_mkdir() {
        let transport = Arc::new(FakeTransport::new(TransportCapability::Opaque));
        let eng = engine(Arc::clone(&transport));

        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("lib/drivers/pump.mpy"));

        let report = eng.apply(RunId::new(), &plan).await.unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(
            transport.calls(),
            vec!["copy lib/drivers/pump.mpy", "restart"]
        );
    }

    #[tokio::test]
    async fn test_skip_set_is_surfaced_in_report() {
        let transport = Arc::new(FakeTransport::new(TransportCapability::Introspectable));
        let eng = engine(Arc::clone(&transport));

        let mut plan = ChangePlan::new();
        plan.to_skip_delete.insert(path("webrepl_cfg.py"));

        let report = eng.apply(RunId::new(), &plan).await.unwrap();
        assert_eq!(report.skipped_protected, vec![path("webrepl_cfg.py")]);
    }
}
