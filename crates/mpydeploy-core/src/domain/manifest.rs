//! Manifest types describing local and remote file state
//!
//! A manifest is a snapshot of a file tree: every file path mapped to its
//! content digest. The local manifest is built by hashing the artifact
//! directory; the remote manifest is built by interrogating the device over
//! an introspectable transport. The diff engine consumes one of each.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::newtypes::{ContentDigest, DevicePath};

/// A single file within a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the tree root
    pub path: DevicePath,

    /// Content digest, if one could be computed
    ///
    /// `None` means the file exists but its content could not be hashed
    /// (some devices cannot hash certain files). An entry without a digest
    /// never compares equal to anything, so the file is conservatively
    /// re-copied.
    pub digest: Option<ContentDigest>,

    /// File size in bytes, when the source reports one
    pub size: Option<u64>,
}

impl ManifestEntry {
    /// Create an entry with a known digest
    #[must_use]
    pub fn new(path: DevicePath, digest: ContentDigest) -> Self {
        Self {
            path,
            digest: Some(digest),
            size: None,
        }
    }

    /// Create an entry whose content could not be hashed
    #[must_use]
    pub fn without_digest(path: DevicePath) -> Self {
        Self {
            path,
            digest: None,
            size: None,
        }
    }

    /// Attach a size to the entry
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// An ordered snapshot of a file tree
///
/// Iteration order is lexicographic by path, which keeps plan output and
/// logs deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    entries: BTreeMap<DevicePath, ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any previous entry for the same path
    pub fn insert(&mut self, entry: ManifestEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    /// Look up an entry by path
    #[must_use]
    pub fn get(&self, path: &DevicePath) -> Option<&ManifestEntry> {
        self.entries.get(path)
    }

    /// Whether the manifest contains the given path
    #[must_use]
    pub fn contains(&self, path: &DevicePath) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in path order
    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.entries.values()
    }

    /// Iterate paths in order
    pub fn paths(&self) -> impl Iterator<Item = &DevicePath> {
        self.entries.keys()
    }
}

impl FromIterator<ManifestEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ManifestEntry>>(iter: I) -> Self {
        let mut manifest = Self::new();
        for entry in iter {
            manifest.insert(entry);
        }
        manifest
    }
}

/// What is known about the remote file tree
///
/// An opaque transport cannot enumerate the device filesystem, so the
/// remote side is `Unknown` rather than an empty manifest. The distinction
/// matters: an empty manifest means "the device is empty", while `Unknown`
/// means "copy everything and delete nothing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    /// The remote tree was enumerated and hashed
    Known(Manifest),

    /// The transport cannot introspect the remote tree
    Unknown,
}

impl RemoteState {
    /// Whether the remote tree was enumerated
    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}
