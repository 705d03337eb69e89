// SPDX-License-Identifier: MIT

//! Shell: identity + state + indices (§3 *Shell*).

use crate::job::{Job, JobId};
use crate::script::ScriptId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

crate::define_id! {
    /// Stable identifier for a persistent caller-scoped shell.
    pub struct ShellId;
}

/// A persistent caller-scoped state capsule: cwd, env, vars, script history.
///
/// Invariants (§3): `scripts_by_pid` is consistent with `scripts`; removing a
/// shell removes all its scripts and jobs; at most `MAX_SHELLS` shells exist
/// at any time (enforced by the Shell Manager, not this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shell {
    pub id: ShellId,
    pub description: Option<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub vars: HashMap<String, String>,
    /// Running or completed scripts submitted on this shell.
    pub scripts: HashMap<ScriptId, crate::script::Script>,
    /// Index from a running script's child pid back to its script id (I1).
    pub scripts_by_pid: HashMap<u32, ScriptId>,
    /// Processes spawned *by* scripts during execution (§3 *Shell*, GLOSSARY
    /// *Job*), keyed at the shell level rather than nested under each script.
    pub jobs: HashMap<JobId, Job>,
    pub created_at_ms: u64,
    pub last_activity_at_ms: u64,
}

impl Shell {
    pub fn new(id: ShellId, cwd: PathBuf, env: HashMap<String, String>, now_ms: u64) -> Self {
        Self {
            id,
            description: None,
            cwd,
            env,
            vars: HashMap::new(),
            scripts: HashMap::new(),
            scripts_by_pid: HashMap::new(),
            jobs: HashMap::new(),
            created_at_ms: now_ms,
            last_activity_at_ms: now_ms,
        }
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity_at_ms = now_ms;
    }

    /// True if any tracked script on this shell is still running.
    pub fn has_running_scripts(&self) -> bool {
        self.scripts
            .values()
            .any(|s| s.status == crate::script::ScriptStatus::Running)
    }

    /// Record a script, indexing it by pid if one was assigned (I1).
    pub fn insert_script(&mut self, script: crate::script::Script) {
        if script.pid != 0 {
            self.scripts_by_pid.insert(script.pid, script.id.clone());
        }
        self.scripts.insert(script.id.clone(), script);
    }

    /// Record a job spawned by `parent_script_id`, linking it onto that
    /// script's `job_ids` (§3 *Script*: "jobIds: list of child Job ids").
    pub fn insert_job(&mut self, job: Job) {
        if let Some(script) = self.scripts.get_mut(&job.parent_script_id) {
            let id_str = job.id.as_str().to_string();
            if !script.job_ids.contains(&id_str) {
                script.job_ids.push(id_str);
            }
        }
        self.jobs.insert(job.id.clone(), job);
    }

    /// Checks invariant I1: every non-zero pid in `scripts` is mirrored in
    /// `scripts_by_pid`, and only there.
    pub fn check_pid_index_consistency(&self) -> bool {
        for script in self.scripts.values() {
            if script.pid != 0 && self.scripts_by_pid.get(&script.pid) != Some(&script.id) {
                return false;
            }
        }
        self.scripts_by_pid
            .values()
            .all(|id| self.scripts.contains_key(id))
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
