//! Persisted version-manifest reader
//!
//! The build pipeline that produces the artifact directory also writes a
//! `version.json` next to it, recording a module version and a SHA-256
//! digest for every artifact. This module reads that file. It never writes
//! it; the schema belongs to the build pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::newtypes::{ContentDigest, DevicePath};

/// Default file name of the persisted manifest
pub const VERSION_MANIFEST_FILE: &str = "version.json";

/// On-disk schema of `version.json`
#[derive(Debug, Deserialize)]
struct RawVersionManifest {
    #[serde(default)]
    modules: BTreeMap<String, String>,
    #[serde(rename = "SHA-256", default)]
    digests: BTreeMap<String, String>,
}

/// Parsed contents of a `version.json` manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionManifest {
    versions: BTreeMap<DevicePath, String>,
    digests: BTreeMap<DevicePath, ContentDigest>,
}

impl VersionManifest {
    /// Load and validate a manifest from a file
    ///
    /// # Errors
    /// Fails if the file cannot be read, is not valid JSON, or contains a
    /// path or digest that does not validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read version manifest: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse version manifest: {}", path.display()))
    }

    /// Parse a manifest from JSON text
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawVersionManifest =
            serde_json::from_str(content).context("Invalid version manifest JSON")?;

        let mut versions = BTreeMap::new();
        for (path, version) in raw.modules {
            let path = DevicePath::new(path).context("Invalid module path")?;
            versions.insert(path, version);
        }

        let mut digests = BTreeMap::new();
        for (path, digest) in raw.digests {
            let path = DevicePath::new(path).context("Invalid digest path")?;
            let digest = ContentDigest::new(digest).context("Invalid recorded digest")?;
            digests.insert(path, digest);
        }

        Ok(Self { versions, digests })
    }

    /// Recorded digest for a path, if present
    #[must_use]
    pub fn digest_for(&self, path: &DevicePath) -> Option<&ContentDigest> {
        self.digests.get(path)
    }

    /// Recorded module version for a path, if present
    #[must_use]
    pub fn version_for(&self, path: &DevicePath) -> Option<&str> {
        self.versions.get(path).map(String::as_str)
    }

    /// Iterate all recorded versions in path order
    pub fn versions(&self) -> impl Iterator<Item = (&DevicePath, &str)> {
        self.versions.iter().map(|(p, v)| (p, v.as_str()))
    }

    /// Number of modules with a recorded version
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the manifest records no modules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
