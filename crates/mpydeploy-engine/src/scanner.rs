//! Manifest builder
//!
//! Walks the local artifact tree and produces a manifest of every regular
//! file with its SHA-256 digest. Hashing runs in parallel across files with
//! a bounded task set; the manifest is returned only once every file has
//! been hashed. Any unreadable file aborts the scan, since deploying an
//! incomplete tree would silently drop modules.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;
use tracing::{debug, instrument};

use mpydeploy_core::domain::{ContentDigest, DevicePath, Manifest, ManifestEntry};

use crate::EngineError;

/// Hash one file into a manifest entry.
async fn hash_file(root: PathBuf, path: DevicePath) -> anyhow::Result<ManifestEntry> {
    let full = root.join(path.as_str());
    let data = tokio::fs::read(&full)
        .await
        .with_context(|| format!("Failed to read {}", full.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&data);
    let digest = ContentDigest::from_bytes(hasher.finalize().into());

    Ok(ManifestEntry::new(path, digest).with_size(data.len() as u64))
}

/// Collect the relative paths of all regular files under `root`.
///
/// Symlinks and other non-regular entries are skipped with a debug log.
async fn collect_files(root: &Path) -> anyhow::Result<Vec<DevicePath>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            // symlink_metadata so links are never followed
            let meta = tokio::fs::symlink_metadata(&entry_path).await?;

            if meta.is_dir() {
                pending.push(entry_path);
            } else if meta.is_file() {
                let relative = entry_path
                    .strip_prefix(root)
                    .expect("entry is under the scanned root");
                let relative = relative
                    .to_str()
                    .ok_or_else(|| anyhow!("Non-UTF-8 file name: {}", entry_path.display()))?;
                // Windows-style separators normalized for the device side.
                let device_path = DevicePath::new(relative.replace('\\', "/"))
                    .with_context(|| format!("Unusable artifact path: {relative}"))?;
                files.push(device_path);
            } else {
                debug!(path = %entry_path.display(), "skipping non-regular file");
            }
        }
    }

    Ok(files)
}

/// Build a manifest of the artifact tree rooted at `root`.
///
/// `concurrency` bounds how many files are hashed at once.
#[instrument(skip_all, fields(root = %root.display()))]
pub async fn build_local_manifest(
    root: &Path,
    concurrency: usize,
) -> Result<Manifest, EngineError> {
    if !root.is_dir() {
        return Err(EngineError::Scan(anyhow!(
            "Source directory does not exist: {}",
            root.display()
        )));
    }
    let concurrency = concurrency.max(1);

    let files = collect_files(root).await.map_err(EngineError::Scan)?;
    debug!(count = files.len(), "local files collected");

    let mut manifest = Manifest::new();
    let mut tasks: JoinSet<anyhow::Result<ManifestEntry>> = JoinSet::new();
    let mut queue = files.into_iter();

    loop {
        while tasks.len() < concurrency {
            match queue.next() {
                Some(path) => {
                    tasks.spawn(hash_file(root.to_path_buf(), path));
                }
                None => break,
            }
        }

        match tasks.join_next().await {
            Some(joined) => {
                let entry = joined
                    .map_err(|e| EngineError::Scan(anyhow!("Hashing task panicked: {e}")))?
                    .map_err(EngineError::Scan)?;
                manifest.insert(entry);
            }
            None => break,
        }
    }

    debug!(entries = manifest.len(), "local manifest complete");
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &[u8]) {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_scans_nested_tree() {
        let dir = TempDir::new().unwrap();
        write(&dir, "boot.py", b"print('boot')");
        write(&dir, "lib/util.mpy", b"\x4d\x05");
        write(&dir, "lib/drivers/pump.mpy", b"\x4d\x05\x01");

        let manifest = build_local_manifest(dir.path(), 4).await.unwrap();

        assert_eq!(manifest.len(), 3);
        let paths: Vec<&str> = manifest.paths().map(DevicePath::as_str).collect();
        assert_eq!(paths, vec!["boot.py", "lib/drivers/pump.mpy", "lib/util.mpy"]);
    }

    #[tokio::test]
    async fn test_entries_carry_digest_and_size() {
        let dir = TempDir::new().unwrap();
        write(&dir, "main.py", b"x = 1\n");

        let manifest = build_local_manifest(dir.path(), 1).await.unwrap();
        let entry = manifest
            .get(&DevicePath::new("main.py").unwrap())
            .unwrap();

        assert!(entry.digest.is_some());
        assert_eq!(entry.size, Some(6));
    }

    #[tokio::test]
    async fn test_identical_content_same_digest() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.py", b"same");
        write(&dir, "b.py", b"same");
        write(&dir, "c.py", b"different");

        let manifest = build_local_manifest(dir.path(), 2).await.unwrap();
        let get = |p: &str| {
            manifest
                .get(&DevicePath::new(p).unwrap())
                .unwrap()
                .digest
                .clone()
        };

        assert_eq!(get("a.py"), get("b.py"));
        assert_ne!(get("a.py"), get("c.py"));
    }

    #[tokio::test]
    async fn test_empty_tree_gives_empty_manifest() {
        let dir = TempDir::new().unwrap();
        let manifest = build_local_manifest(dir.path(), 8).await.unwrap();
        assert!(manifest.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");
        let result = build_local_manifest(&gone, 8).await;
        assert!(matches!(result, Err(EngineError::Scan(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(&dir, "real.py", b"real");
        std::os::unix::fs::symlink(dir.path().join("real.py"), dir.path().join("link.py"))
            .unwrap();

        let manifest = build_local_manifest(dir.path(), 4).await.unwrap();
        assert_eq!(manifest.len(), 1);
        assert!(manifest.contains(&DevicePath::new("real.py").unwrap()));
    }
}
