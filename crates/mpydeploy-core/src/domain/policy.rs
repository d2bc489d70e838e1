//! Protected-file deletion policy
//!
//! Certain device files must survive a deploy even when they have no local
//! counterpart. The canonical example is `webrepl_cfg.py`: deleting it
//! would sever the very connection used to deploy. The policy is consulted
//! by the diff engine when classifying remote-only files, and re-checked by
//! the apply engine before each delete.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::newtypes::DevicePath;

/// Device file protected from deletion by default
pub const DEFAULT_PROTECTED: &str = "webrepl_cfg.py";

/// A set of device paths exempt from deletion
///
/// Matching is exact, on the full relative path. `webrepl_cfg.py` does not
/// protect `lib/webrepl_cfg.py`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedFiles {
    paths: BTreeSet<DevicePath>,
}

impl ProtectedFiles {
    /// Create a policy from explicit paths
    #[must_use]
    pub fn new(paths: impl IntoIterator<Item = DevicePath>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    /// Create an empty policy (nothing is protected)
    #[must_use]
    pub fn none() -> Self {
        Self {
            paths: BTreeSet::new(),
        }
    }

    /// Whether the given path is protected
    #[must_use]
    pub fn is_protected(&self, path: &DevicePath) -> bool {
        self.paths.contains(path)
    }

    /// Iterate protected paths in order
    pub fn iter(&self) -> impl Iterator<Item = &DevicePath> {
        self.paths.iter()
    }
}

impl Default for ProtectedFiles {
    /// The default policy protects the WebREPL configuration file
    fn default() -> Self {
        // DEFAULT_PROTECTED is a valid relative path.
        let path = DevicePath::new(DEFAULT_PROTECTED).expect("default protected path is valid");
        Self::new([path])
    }
}
