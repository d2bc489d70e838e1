//! Serial transport via the external `mpremote` tool
//!
//! Every operation is one `mpremote connect <device> ...` invocation. The
//! tool owns the serial protocol, timeouts included; this adapter only
//! builds argument lists and parses output. The output parsers are pure
//! functions so they can be tested without a device.

use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use mpydeploy_core::domain::{ContentDigest, DevicePath};
use mpydeploy_core::ports::{IDeviceTransport, TransportCapability};

/// One entry of an `fs ls` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Parse the output of `mpremote fs ls :<dir>`.
///
/// The first line echoes the command (`ls :...`); each entry line is
/// `<size> <name>`, with directories marked by a trailing `/`.
pub fn parse_ls_output(output: &str) -> Vec<LsEntry> {
    let mut entries = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("ls :") {
            continue;
        }
        let Some((size, name)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        if size.parse::<u64>().is_err() {
            continue;
        }
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        entries.push(LsEntry {
            name: name.trim_end_matches('/').to_string(),
            is_dir: name.ends_with('/'),
        });
    }
    entries
}

/// Extract the digest from `mpremote fs sha256sum :<path>` output.
///
/// The digest is the first 64-character hex token in the output; mpremote
/// prints it ahead of the file name.
pub fn parse_sha256_output(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .find(|token| {
            token.len() == 64
                && token
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
        .map(str::to_string)
}

/// Introspectable transport over a serial connection.
pub struct MpremoteTransport {
    bin: String,
    device: String,
}

impl MpremoteTransport {
    /// Create a transport for the given serial device.
    pub fn new(bin: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            device: device.into(),
        }
    }

    /// Run one mpremote invocation and return its stdout.
    async fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        debug!(device = %self.device, ?args, "running mpremote");
        let output = Command::new(&self.bin)
            .arg("connect")
            .arg(&self.device)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to spawn {}", self.bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "mpremote {} failed ({}): {}",
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// List one remote directory. `dir` is empty for the device root.
    async fn list_dir(&self, dir: &str) -> anyhow::Result<Vec<LsEntry>> {
        let target = format!(":{dir}");
        let output = self.run(&["fs", "ls", &target]).await?;
        Ok(parse_ls_output(&output))
    }
}

#[async_trait]
impl IDeviceTransport for MpremoteTransport {
    fn capability(&self) -> TransportCapability {
        TransportCapability::Introspectable
    }

    fn describe(&self) -> String {
        format!("serial:{}", self.device)
    }

    #[instrument(skip(self))]
    async fn check_reachable(&self) -> anyhow::Result<()> {
        // A root listing both proves the connection and warms the REPL.
        self.run(&["fs", "ls", ":"]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_files(&self) -> anyhow::Result<Vec<DevicePath>> {
        let mut files = Vec::new();
        let mut pending = vec![String::new()];

        while let Some(prefix) = pending.pop() {
            for entry in self.list_dir(&prefix).await? {
                let full = if prefix.is_empty() {
                    entry.name
                } else {
                    format!("{prefix}{}", entry.name)
                };
                if entry.is_dir {
                    pending.push(format!("{full}/"));
                } else {
                    files.push(
                        DevicePath::new(full).context("Device returned an unusable path")?,
                    );
                }
            }
        }

        Ok(files)
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn hash_file(&self, path: &DevicePath) -> anyhow::Result<Option<ContentDigest>> {
        let target = format!(":{path}");
        let output = match self.run(&["fs", "sha256sum", &target]).await {
            Ok(out) => out,
            // Some firmware builds lack sha256sum for certain files; the
            // caller treats a missing digest as "changed".
            Err(e) => {
                debug!(error = %e, "sha256sum failed");
                return Ok(None);
            }
        };

        match parse_sha256_output(&output) {
            Some(hex) => Ok(Some(ContentDigest::new(hex)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn make_dir(&self, path: &DevicePath) -> anyhow::Result<()> {
        let target = format!(":{path}");
        match self.run(&["fs", "mkdir", &target]).await {
            Ok(_) => Ok(()),
            // mkdir on an existing directory is success for our purposes.
            Err(e) if e.to_string().contains("EEXIST") || e.to_string().contains("File exists") => {
                debug!("directory already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, local), fields(remote = %remote))]
    async fn copy_file(&self, local: &Path, remote: &DevicePath) -> anyhow::Result<()> {
        let local = local
            .to_str()
            .ok_or_else(|| anyhow!("Non-UTF-8 local path: {}", local.display()))?;
        let target = format!(":{remote}");
        self.run(&["fs", "cp", local, &target]).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete_file(&self, path: &DevicePath) -> anyhow::Result<()> {
        let target = format!(":{path}");
        self.run(&["fs", "rm", &target]).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn restart(&self) -> anyhow::Result<()> {
        self.run(&["soft-reset"]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod ls_parsing {
        use super::*;

        #[test]
        fn test_parses_files_and_dirs() {
            let output = "ls :\n         139 boot.py\n        2074 main.py\n           0 lib/\n";
            let entries = parse_ls_output(output);

            assert_eq!(
                entries,
                vec![
                    LsEntry {
                        name: "boot.py".to_string(),
                        is_dir: false
                    },
                    LsEntry {
                        name: "main.py".to_string(),
                        is_dir: false
                    },
                    LsEntry {
                        name: "lib".to_string(),
                        is_dir: true
                    },
                ]
            );
        }

        #[test]
        fn test_empty_listing() {
            assert!(parse_ls_output("ls :\n").is_empty());
            assert!(parse_ls_output("").is_empty());
        }

        #[test]
        fn test_ignores_malformed_lines() {
            let output = "ls :\ngarbage line without size\n         10 ok.py\n";
            let entries = parse_ls_output(output);
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].name, "ok.py");
        }

        #[test]
        fn test_name_with_spaces() {
            let output = "ls :\n          12 my file.py\n";
            let entries = parse_ls_output(output);
            assert_eq!(entries[0].name, "my file.py");
        }
    }

    mod sha256_parsing {
        use super::*;

        #[test]
        fn test_extracts_digest() {
            let hex = "a".repeat(64);
            let output = format!("sha256sum :main.py\n{hex}  :main.py\n");
            assert_eq!(parse_sha256_output(&output), Some(hex));
        }

        #[test]
        fn test_rejects_uppercase_and_short_tokens() {
            let upper = "A".repeat(64);
            let short = "a".repeat(40);
            let output = format!("{upper} {short}\n");
            assert_eq!(parse_sha256_output(&output), None);
        }

        #[test]
        fn test_no_digest_in_output() {
            assert_eq!(parse_sha256_output("error: no such file\n"), None);
        }
    }

    #[test]
    fn test_describe_includes_device() {
        let t = MpremoteTransport::new("mpremote", "/dev/ttyUSB0");
        assert_eq!(t.describe(), "serial:/dev/ttyUSB0");
        assert_eq!(t.capability(), TransportCapability::Introspectable);
    }
}
