// SPDX-License-Identifier: MIT

//! Stale-pid reaping and terminal-script pruning, run once on snapshot load
//! (§4.12 "On load").

use safeshell_core::script::{ScriptId, ScriptStatus};
use safeshell_core::PersistedState;
use std::path::Path;

/// For every script persisted as `Running` with a pid, probe whether that
/// process is still alive; if not, transition it to `Failed` with
/// `completedAt = now`.
pub fn reap_stale_pids(state: &mut PersistedState, now_ms: u64) {
    for script in state.scripts.values_mut() {
        if script.status == ScriptStatus::Running && script.pid != 0 && !process_is_alive(script.pid) {
            script.status = ScriptStatus::Failed;
            script.exit_code = Some(-1);
            script.completed_at_ms = Some(now_ms);
        }
    }
}

/// Keep only the most recent `keep` terminal scripts (by `completed_at_ms`,
/// falling back to `started_at_ms`), to bound snapshot growth (§4.12).
/// Running scripts are never pruned.
pub fn prune_terminal_scripts(state: &mut PersistedState, keep: usize) {
    let mut terminal_ids: Vec<ScriptId> = state
        .scripts
        .iter()
        .filter(|(_, s)| s.status != ScriptStatus::Running)
        .map(|(id, _)| id.clone())
        .collect();

    if terminal_ids.len() <= keep {
        return;
    }

    terminal_ids.sort_by_key(|id| {
        let script = &state.scripts[id];
        script.completed_at_ms.unwrap_or(script.started_at_ms)
    });

    let drop_count = terminal_ids.len() - keep;
    for id in terminal_ids.into_iter().take(drop_count) {
        state.scripts.remove(&id);
    }
}

/// Checks `/proc/<pid>` for liveness on Linux. Non-Linux targets have no
/// portable, allocation-free, `unsafe`-free equivalent available in this
/// workspace (`unsafe_code` is forbidden workspace-wide), so they
/// conservatively report every pid as alive rather than reaping scripts
/// they cannot actually verify.
#[cfg(target_os = "linux")]
fn process_is_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_is_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;
