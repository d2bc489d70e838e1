//! Dry-run reporter
//!
//! Renders a change plan as a human-readable summary without touching the
//! device. Paths are listed in sorted order with a `+`/`~`/`-` marker for
//! add/update/delete, matching the summary shown before a live apply.

use std::fmt::Write;

use mpydeploy_core::domain::{ChangePlan, RemoteState};

/// Render a plan to a displayable summary.
#[must_use]
pub fn render_plan(plan: &ChangePlan, remote: &RemoteState) -> String {
    let mut out = String::new();

    if !remote.is_known() {
        let _ = writeln!(
            out,
            "Remote state unknown: copying all local files, deleting nothing."
        );
    }

    if plan.is_empty() && plan.to_skip_delete.is_empty() {
        let _ = writeln!(out, "Device is up to date. No changes needed.");
        return out;
    }

    let _ = writeln!(
        out,
        "Planned changes: {} ({} add, {} update, {} delete)",
        plan.total_changes(),
        plan.to_add.len(),
        plan.to_update.len(),
        plan.to_delete.len()
    );

    for path in &plan.to_add {
        let _ = writeln!(out, "  + {path}");
    }
    for path in &plan.to_update {
        let _ = writeln!(out, "  ~ {path}");
    }
    for path in &plan.to_delete {
        let _ = writeln!(out, "  - {path}");
    }

    if !plan.to_skip_delete.is_empty() {
        let _ = writeln!(out, "Protected files kept on device:");
        for path in &plan.to_skip_delete {
            let _ = writeln!(out, "  = {path}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpydeploy_core::domain::{DevicePath, Manifest};

    fn path(s: &str) -> DevicePath {
        DevicePath::new(s).unwrap()
    }

    fn known_empty() -> RemoteState {
        RemoteState::Known(Manifest::new())
    }

    #[test]
    fn test_empty_plan_renders_up_to_date() {
        let out = render_plan(&ChangePlan::new(), &known_empty());
        assert!(out.contains("up to date"));
    }

    #[test]
    fn test_markers_and_counts() {
        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("new.py"));
        plan.to_update.insert(path("main.py"));
        plan.to_delete.insert(path("old.py"));

        let out = render_plan(&plan, &known_empty());

        assert!(out.contains("Planned changes: 3 (1 add, 1 update, 1 delete)"));
        assert!(out.contains("  + new.py"));
        assert!(out.contains("  ~ main.py"));
        assert!(out.contains("  - old.py"));
    }

    #[test]
    fn test_paths_are_sorted_within_sections() {
        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("z.py"));
        plan.to_add.insert(path("a.py"));

        let out = render_plan(&plan, &known_empty());
        let a = out.find("+ a.py").unwrap();
        let z = out.find("+ z.py").unwrap();
        assert!(a < z);
    }

    #[test]
    fn test_protected_skips_are_visible() {
        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("main.py"));
        plan.to_skip_delete.insert(path("webrepl_cfg.py"));

        let out = render_plan(&plan, &known_empty());
        assert!(out.contains("Protected files kept on device:"));
        assert!(out.contains("  = webrepl_cfg.py"));
    }

    #[test]
    fn test_skip_only_plan_is_still_reported() {
        let mut plan = ChangePlan::new();
        plan.to_skip_delete.insert(path("webrepl_cfg.py"));

        let out = render_plan(&plan, &known_empty());
        assert!(out.contains("webrepl_cfg.py"));
    }

    #[test]
    fn test_unknown_remote_note() {
        let mut plan = ChangePlan::new();
        plan.to_add.insert(path("main.py"));

        let out = render_plan(&plan, &RemoteState::Unknown);
        assert!(out.contains("Remote state unknown"));
    }
}
