//! Diff engine
//!
//! Pure reconciliation of a local manifest against the known (or unknown)
//! remote state. No I/O happens here: the inputs are already-validated
//! snapshots, and the same inputs always produce the same plan.
//!
//! Classification rules:
//! - Local file absent from the remote tree: add.
//! - Present on both sides with equal digests: no operation.
//! - Present on both sides with differing digests, or a remote entry whose
//!   digest could not be computed: update.
//! - Remote-only file: delete, unless protected, in which case it is
//!   diverted to the skip set.
//! - Unknown remote state: every local file is an add, nothing is deleted.

use crate::domain::{ChangePlan, Manifest, ProtectedFiles, RemoteState};

/// Compute the change plan that reconciles `remote` with `local`
#[must_use]
pub fn compute_plan(
    local: &Manifest,
    remote: &RemoteState,
    protected: &ProtectedFiles,
) -> ChangePlan {
    let mut plan = ChangePlan::new();

    let remote = match remote {
        RemoteState::Known(manifest) => manifest,
        RemoteState::Unknown => {
            // No visibility into the device: push everything, delete
            // nothing.
            for entry in local.iter() {
                plan.to_add.insert(entry.path.clone());
            }
            return plan;
        }
    };

    for entry in local.iter() {
        match remote.get(&entry.path) {
            None => {
                plan.to_add.insert(entry.path.clone());
            }
            Some(remote_entry) => {
                let unchanged = match (&entry.digest, &remote_entry.digest) {
                    (Some(local_digest), Some(remote_digest)) => local_digest == remote_digest,
                    // An unhashable side can never be proven equal.
                    _ => false,
                };
                if !unchanged {
                    plan.to_update.insert(entry.path.clone());
                }
            }
        }
    }

    for remote_path in remote.paths() {
        if local.contains(remote_path) {
            continue;
        }
        if protected.is_protected(remote_path) {
            plan.to_skip_delete.insert(remote_path.clone());
        } else {
            plan.to_delete.insert(remote_path.clone());
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentDigest, DevicePath, ManifestEntry};

    fn path(s: &str) -> DevicePath {
        DevicePath::new(s).unwrap()
    }

    fn digest(c: char) -> ContentDigest {
        ContentDigest::new(c.to_string().repeat(64)).unwrap()
    }

    fn manifest(entries: &[(&str, char)]) -> Manifest {
        entries
            .iter()
            .map(|(p, c)| ManifestEntry::new(path(p), digest(*c)))
            .collect()
    }

    fn paths(set: &std::collections::BTreeSet<DevicePath>) -> Vec<&str> {
        set.iter().map(DevicePath::as_str).collect()
    }

    #[test]
    fn test_add_and_delete() {
        // Local has a and b, remote has a (same content) and c.
        let local = manifest(&[("a.bin", '1'), ("b.bin", '2')]);
        let remote = RemoteState::Known(manifest(&[("a.bin", '1'), ("c.bin", '3')]));

        let plan = compute_plan(&local, &remote, &ProtectedFiles::none());

        assert_eq!(paths(&plan.to_add), vec!["b.bin"]);
        assert!(plan.to_update.is_empty());
        assert_eq!(paths(&plan.to_delete), vec!["c.bin"]);
        assert!(plan.to_skip_delete.is_empty());
    }

    #[test]
    fn test_protected_delete_is_skipped() {
        let local = manifest(&[("a.bin", '1'), ("b.bin", '2')]);
        let remote = RemoteState::Known(manifest(&[("a.bin", '1'), ("c.bin", '3')]));
        let protected = ProtectedFiles::new([path("c.bin")]);

        let plan = compute_plan(&local, &remote, &protected);

        assert_eq!(paths(&plan.to_add), vec!["b.bin"]);
        assert!(plan.to_delete.is_empty());
        assert_eq!(paths(&plan.to_skip_delete), vec!["c.bin"]);
    }

    #[test]
    fn test_changed_content_is_update() {
        let local = manifest(&[("a.bin", '1')]);
        let remote = RemoteState::Known(manifest(&[("a.bin", '2')]));

        let plan = compute_plan(&local, &remote, &ProtectedFiles::none());

        assert!(plan.to_add.is_empty());
        assert_eq!(paths(&plan.to_update), vec!["a.bin"]);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_identical_trees_produce_empty_plan() {
        let local = manifest(&[("a.py", '1'), ("lib/b.py", '2')]);
        let remote = RemoteState::Known(local.clone());

        let plan = compute_plan(&local, &remote, &ProtectedFiles::default());
        assert!(plan.is_empty());
        assert!(plan.to_skip_delete.is_empty());
    }

    #[test]
    fn test_unknown_remote_is_full_push() {
        let local = manifest(&[("a.py", '1'), ("lib/b.py", '2')]);

        let plan = compute_plan(&local, &RemoteState::Unknown, &ProtectedFiles::default());

        assert_eq!(paths(&plan.to_add), vec!["a.py", "lib/b.py"]);
        assert!(plan.to_update.is_empty());
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_unhashable_remote_entry_forces_update() {
        let local = manifest(&[("a.py", '1')]);
        let mut remote = Manifest::new();
        remote.insert(ManifestEntry::without_digest(path("a.py")));

        let plan = compute_plan(&local, &RemoteState::Known(remote), &ProtectedFiles::none());
        assert_eq!(paths(&plan.to_update), vec!["a.py"]);
    }

    #[test]
    fn test_protected_file_present_locally_is_still_copied() {
        // Protection only exempts from deletion; a local counterpart still
        // deploys normally.
        let local = manifest(&[("webrepl_cfg.py", '1')]);
        let remote = RemoteState::Known(manifest(&[("webrepl_cfg.py", '2')]));

        let plan = compute_plan(&local, &remote, &ProtectedFiles::default());
        assert_eq!(paths(&plan.to_update), vec!["webrepl_cfg.py"]);
        assert!(plan.to_skip_delete.is_empty());
    }

    #[test]
    fn test_sets_are_disjoint() {
        let local = manifest(&[("a.py", '1'), ("b.py", '2'), ("c.py", '3')]);
        let remote = RemoteState::Known(manifest(&[
            ("b.py", '9'),
            ("d.py", '4'),
            ("webrepl_cfg.py", '5'),
        ]));

        let plan = compute_plan(&local, &remote, &ProtectedFiles::default());

        for p in &plan.to_add {
            assert!(!plan.to_update.contains(p));
            assert!(!plan.to_delete.contains(p));
            assert!(!plan.to_skip_delete.contains(p));
        }
        for p in &plan.to_update {
            assert!(!plan.to_delete.contains(p));
            assert!(!plan.to_skip_delete.contains(p));
        }
        for p in &plan.to_delete {
            assert!(!plan.to_skip_delete.contains(p));
        }
    }

    #[test]
    fn test_empty_local_deletes_everything_unprotected() {
        let local = Manifest::new();
        let remote = RemoteState::Known(manifest(&[("a.py", '1'), ("webrepl_cfg.py", '2')]));

        let plan = compute_plan(&local, &remote, &ProtectedFiles::default());
        assert_eq!(paths(&plan.to_delete), vec!["a.py"]);
        assert_eq!(paths(&plan.to_skip_delete), vec!["webrepl_cfg.py"]);
    }
}
