//! Change plan produced by the diff engine
//!
//! A `ChangePlan` is the complete, ordered answer to "what must happen on
//! the device". It is pure data: computing it performs no I/O, and the same
//! local/remote inputs always produce the same plan.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::newtypes::DevicePath;

/// The set of operations required to make the remote tree match the local
/// tree
///
/// The four sets are pairwise disjoint. `to_skip_delete` holds files that
/// are remote-only but protected; they are surfaced for visibility and
/// never executed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePlan {
    /// Local files missing from the remote tree
    pub to_add: BTreeSet<DevicePath>,

    /// Files present on both sides with differing (or unknowable) content
    pub to_update: BTreeSet<DevicePath>,

    /// Remote-only files to remove
    pub to_delete: BTreeSet<DevicePath>,

    /// Remote-only files exempted from deletion by the protected-file policy
    pub to_skip_delete: BTreeSet<DevicePath>,
}

impl ChangePlan {
    /// Create an empty plan
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deletions that will actually run
    ///
    /// Protected paths were already diverted to `to_skip_delete` when the
    /// plan was computed, so this is simply `to_delete` in path order.
    pub fn executable_deletes(&self) -> impl Iterator<Item = &DevicePath> {
        self.to_delete.iter()
    }

    /// All paths that will be copied to the device, in path order
    pub fn copy_targets(&self) -> impl Iterator<Item = &DevicePath> {
        self.to_add.iter().chain(self.to_update.iter())
    }

    /// Unique parent directories required by the copy targets
    ///
    /// Ordered parents-before-children so callers can create them in
    /// sequence. Root-level files contribute nothing.
    #[must_use]
    pub fn required_dirs(&self) -> Vec<DevicePath> {
        let mut dirs: BTreeSet<DevicePath> = BTreeSet::new();
        for target in self.copy_targets() {
            dirs.extend(target.ancestors());
        }
        // BTreeSet ordering already yields every prefix before its
        // extensions.
        dirs.into_iter().collect()
    }

    /// Whether the plan contains no executable work
    ///
    /// Skipped protected deletes do not count as work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of executable file operations
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.to_delete.len()
    }
}
