// SPDX-License-Identifier: MIT

//! Job: a process spawned *by* a Script during execution (§3 *Job*, GLOSSARY).
//!
//! Not to be confused with a job queue entry in other systems — here a "Job"
//! is strictly a child process a running Script's code launched (e.g. the
//! `git` invocation a script performed), tracked with the same lifecycle
//! shape as a Script but parented to it.

use crate::script::{ScriptId, ScriptStatus};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for a process spawned during a Script.
    pub struct JobId;
}

/// Re-exported for symmetry with [`crate::script::ScriptStatus`]; a Job's
/// lifecycle is identical to a Script's.
pub type JobStatus = ScriptStatus;

/// A process spawned during a Script, e.g. a `git` invocation the script
/// performed (§3 *Job*).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub parent_script_id: ScriptId,
    pub command: String,
    pub args: Vec<String>,
    pub pid: u32,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub started_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub background: bool,
    #[serde(skip)]
    pub handle: Option<u64>,
}

impl Job {
    pub fn new_running(
        id: JobId,
        parent_script_id: ScriptId,
        command: String,
        args: Vec<String>,
        pid: u32,
        background: bool,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            parent_script_id,
            command,
            args,
            pid,
            status: JobStatus::Running,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            started_at_ms: now_ms,
            completed_at_ms: None,
            background,
            handle: None,
        }
    }

    pub fn complete(&mut self, exit_code: i32, now_ms: u64) {
        if self.status.is_terminal() {
            return;
        }
        self.status = if exit_code == 0 {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };
        self.exit_code = Some(exit_code);
        self.completed_at_ms = Some(now_ms.max(self.started_at_ms));
        self.handle = None;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
