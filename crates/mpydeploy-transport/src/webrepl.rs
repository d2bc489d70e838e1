//! Network transport via an external WebREPL command-line client
//!
//! WebREPL is a write-and-restart channel: the client can push files and
//! reset the board, but it cannot list, hash, or delete remote files. The
//! adapter is therefore `Opaque`, and the engines plan a full push against
//! it.
//!
//! ## Expected client interface
//!
//! The configured client executable (`webrepl_cli.py` by default) must
//! accept:
//!
//! ```text
//! <client> [-p <password>] --port <port> <local> <host>:/<remote>   # copy
//! <client> [-p <password>] --port <port> <host>                     # probe
//! <client> [-p <password>] --port <port> --soft-reset <host>        # restart
//! ```
//!
//! The probe form connects, authenticates, and exits.

use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use mpydeploy_core::domain::{ContentDigest, DevicePath};
use mpydeploy_core::ports::{IDeviceTransport, TransportCapability};

/// Opaque transport over a WebREPL network connection.
pub struct WebreplTransport {
    client_bin: String,
    host: String,
    port: u16,
    password: Option<String>,
}

impl WebreplTransport {
    /// Create a transport for the given WebREPL endpoint.
    pub fn new(
        client_bin: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        password: Option<String>,
    ) -> Self {
        Self {
            client_bin: client_bin.into(),
            host: host.into(),
            port,
            password,
        }
    }

    /// Shared connection arguments every invocation starts with.
    fn base_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(password) = &self.password {
            args.push("-p".to_string());
            args.push(password.clone());
        }
        args.push("--port".to_string());
        args.push(self.port.to_string());
        args
    }

    /// Arguments for pushing one local file to the device.
    fn copy_args(&self, local: &str, remote: &DevicePath) -> Vec<String> {
        let mut args = self.base_args();
        args.push(local.to_string());
        args.push(format!("{}:/{remote}", self.host));
        args
    }

    /// Arguments for a connect-authenticate-exit reachability check.
    fn probe_args(&self) -> Vec<String> {
        let mut args = self.base_args();
        args.push(self.host.clone());
        args
    }

    /// Arguments for soft-resetting the board.
    fn restart_args(&self) -> Vec<String> {
        let mut args = self.base_args();
        args.push("--soft-reset".to_string());
        args.push(self.host.clone());
        args
    }

    /// Run one client invocation.
    async fn run(&self, args: Vec<String>) -> anyhow::Result<()> {
        let mut cmd = Command::new(&self.client_bin);
        cmd.args(&args);
        cmd.stdin(Stdio::null());

        debug!(host = %self.host, ?args, "running webrepl client");
        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", self.client_bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "webrepl client failed ({}): {}",
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl IDeviceTransport for WebreplTransport {
    fn capability(&self) -> TransportCapability {
        TransportCapability::Opaque
    }

    fn describe(&self) -> String {
        format!("webrepl:{}:{}", self.host, self.port)
    }

    #[instrument(skip(self))]
    async fn check_reachable(&self) -> anyhow::Result<()> {
        self.run(self.probe_args()).await
    }

    async fn list_files(&self) -> anyhow::Result<Vec<DevicePath>> {
        bail!("WebREPL transport cannot list remote files")
    }

    async fn hash_file(&self, _path: &DevicePath) -> anyhow::Result<Option<ContentDigest>> {
        bail!("WebREPL transport cannot hash remote files")
    }

    async fn make_dir(&self, _path: &DevicePath) -> anyhow::Result<()> {
        bail!("WebREPL transport cannot create directories")
    }

    #[instrument(skip(self, local), fields(remote = %remote))]
    async fn copy_file(&self, local: &Path, remote: &DevicePath) -> anyhow::Result<()> {
        let local = local
            .to_str()
            .ok_or_else(|| anyhow!("Non-UTF-8 local path: {}", local.display()))?;
        self.run(self.copy_args(local, remote)).await
    }

    async fn delete_file(&self, _path: &DevicePath) -> anyhow::Result<()> {
        bail!("WebREPL transport cannot delete remote files")
    }

    #[instrument(skip(self))]
    async fn restart(&self) -> anyhow::Result<()> {
        self.run(self.restart_args()).await
    }
}
