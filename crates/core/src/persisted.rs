// SPDX-License-Identifier: MIT

//! PersistedState: the atomic snapshot shape (§3 *PersistedState*, §4.12 C12,
//! §6 "Snapshot file format").
//!
//! Only metadata is persisted — never live output buffers or process
//! handles (§5 "Shared-resource policy"). `Script`/`Job` stdout/stderr are
//! still included here so a `safesh script show`-style inspection works
//! after a restart; what is dropped is the live process handle and anything
//! that would require a running child to reconstruct.

use crate::script::{ScriptId, ScriptStatus};
use crate::shell::ShellId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted view of a Shell (metadata only — no live buffers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedShell {
    pub id: ShellId,
    pub description: Option<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
    pub vars: HashMap<String, String>,
    pub created_at_ms: u64,
    pub last_activity_at_ms: u64,
}

/// Persisted view of a Script (metadata only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedScript {
    pub id: ScriptId,
    pub shell_id: ShellId,
    pub code: String,
    pub pid: u32,
    pub status: ScriptStatus,
    pub exit_code: Option<i32>,
    pub started_at_ms: u64,
    pub completed_at_ms: Option<u64>,
    pub background: bool,
}

/// The full persisted snapshot (§6 "Snapshot file format").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    pub updated_at_ms: u64,
    pub project_dir: PathBuf,
    pub shells: HashMap<ShellId, PersistedShell>,
    pub scripts: HashMap<ScriptId, PersistedScript>,
    /// Commands approved via `retry` during the process lifetime, carried so
    /// they remain implicitly allowed without a policy file edit (§4.4 step 1,
    /// SPEC_FULL.md §C "Session allowed commands").
    #[serde(default)]
    pub session_allowed_commands: Vec<String>,
}

impl PersistedState {
    pub fn new(project_dir: PathBuf, now_ms: u64) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            updated_at_ms: now_ms,
            project_dir,
            shells: HashMap::new(),
            scripts: HashMap::new(),
            session_allowed_commands: Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "persisted_tests.rs"]
mod tests;
