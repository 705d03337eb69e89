// SPDX-License-Identifier: MIT

//! Script: a single code-or-command execution record (§3 *Script*).

use serde::{Deserialize, Serialize};
use std::time::Duration;

crate::define_id! {
    /// `script-{shellId}-{seq}`, seq monotonic within the owning shell.
    pub struct ScriptId;
}

/// Terminal/non-terminal state machine: `running` -> `{completed | failed}`,
/// one-way and terminal (§4.11 "State machine (Script)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStatus {
    Running,
    Completed,
    Failed,
}

impl ScriptStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScriptStatus::Running)
    }
}

/// A single submitted code fragment or whitelisted command invocation,
/// tracked as a lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub id: ScriptId,
    /// The submitted fragment, verbatim.
    pub code: String,
    /// Child's pid, 0 if pre-spawn.
    pub pid: u32,
    pub status: ScriptStatus,
    /// Present iff not running (I4).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub started_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub background: bool,
    /// Opaque handle id into the Streaming Runtime's live-process table;
    /// cleared on completion. Never persisted (§4.12: "not live output
    /// buffers or process handles").
    #[serde(skip)]
    pub handle: Option<u64>,
    /// Ids of Jobs (child processes) spawned during this script.
    #[serde(default)]
    pub job_ids: Vec<String>,
}

impl Script {
    pub fn new_running(id: ScriptId, code: String, pid: u32, background: bool, now_ms: u64) -> Self {
        Self {
            id,
            code,
            pid,
            status: ScriptStatus::Running,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            stdout_truncated: false,
            stderr_truncated: false,
            started_at_ms: now_ms,
            completed_at_ms: None,
            duration_ms: None,
            background,
            handle: None,
            job_ids: Vec::new(),
        }
    }

    /// Transition to a terminal state (I4: exit code set, completed_at >= started_at).
    pub fn complete(&mut self, exit_code: i32, now_ms: u64) {
        let status = if exit_code == 0 {
            ScriptStatus::Completed
        } else {
            ScriptStatus::Failed
        };
        self.finish(status, exit_code, now_ms);
    }

    /// Transition to `failed` without a meaningful exit code (timeout, kill,
    /// launch error).
    pub fn fail(&mut self, exit_code: i32, now_ms: u64) {
        self.finish(ScriptStatus::Failed, exit_code, now_ms);
    }

    fn finish(&mut self, status: ScriptStatus, exit_code: i32, now_ms: u64) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.exit_code = Some(exit_code);
        let completed_at = now_ms.max(self.started_at_ms);
        self.completed_at_ms = Some(completed_at);
        self.duration_ms = Some(completed_at.saturating_sub(self.started_at_ms));
        self.handle = None;
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
