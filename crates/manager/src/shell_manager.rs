// SPDX-License-Identifier: MIT

//! C11 Shell Manager (§4.11).
//!
//! Owns the shared, lock-protected table of live [`Shell`]s (§5: "the Shell
//! Manager is shared mutable state and must be serialized"). Per-script
//! live execution state (output buffers, the kill switch, a completion
//! notifier) lives in a *separate* table keyed by script id, each entry
//! independently guarded, so a drain task appending a chunk never contends
//! with an unrelated script's readers or with `list_shells`/`list_scripts`
//! (§5: "per-Script buffers are only written by their own drain tasks and
//! only read by others — readers observe either the pre- or post-append
//! state, never a torn write").

use parking_lot::Mutex;
use safeshell_core::job::{Job, JobId};
use safeshell_core::script::{Script, ScriptId, ScriptStatus};
use safeshell_core::shell::{Shell, ShellId};
use safeshell_core::{Clock, ErrorKind, SafeShellError, SHELL_OUTPUT_CEILING_BYTES};
use safeshell_runtime::OutputBuffer;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Live, per-script execution state: output buffers, a kill switch fed to
/// the Streaming Runtime's drain task, and a notifier fired once the script
/// reaches a terminal state (used by `waitScript`).
pub struct LiveExecution {
    pub stdout: Mutex<OutputBuffer>,
    pub stderr: Mutex<OutputBuffer>,
    kill_tx: Mutex<Option<mpsc::Sender<()>>>,
    pub done: Notify,
}

impl LiveExecution {
    fn new(cap_bytes: usize) -> Self {
        Self {
            stdout: Mutex::new(OutputBuffer::new(cap_bytes)),
            stderr: Mutex::new(OutputBuffer::new(cap_bytes)),
            kill_tx: Mutex::new(None),
            done: Notify::new(),
        }
    }

    /// Attach the kill switch once the child has been spawned.
    pub fn set_kill_switch(&self, tx: mpsc::Sender<()>) {
        *self.kill_tx.lock() = Some(tx);
    }

    /// Request termination (`killScript`). No-op if already completed.
    pub async fn kill(&self) {
        let tx = self.kill_tx.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }
    }
}

/// Optional filters for `listScripts`/`listJobs` (§6).
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<ScriptStatus>,
    pub background: Option<bool>,
    pub limit: Option<usize>,
}

/// C11 Shell Manager: create/lookup/list/end, LRU eviction, script/job
/// indices (§4.11).
pub struct ShellManager {
    clock: Arc<dyn Clock>,
    max_shells: usize,
    output_cap_bytes: usize,
    shells: Mutex<HashMap<ShellId, Shell>>,
    live: Mutex<HashMap<ScriptId, Arc<LiveExecution>>>,
    next_shell_seq: std::sync::atomic::AtomicU64,
    script_seq: Mutex<HashMap<ShellId, u64>>,
}

impl ShellManager {
    pub fn new(clock: Arc<dyn Clock>, max_shells: usize, output_cap_bytes: usize) -> Self {
        Self {
            clock,
            max_shells,
            output_cap_bytes,
            shells: Mutex::new(HashMap::new()),
            live: Mutex::new(HashMap::new()),
            next_shell_seq: std::sync::atomic::AtomicU64::new(1),
            script_seq: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new shell, evicting the LRU shell first if at capacity (I2,
    /// §4.11 "MAX_SHELLS").
    pub fn create_shell(
        &self,
        cwd: PathBuf,
        env: HashMap<String, String>,
        description: Option<String>,
    ) -> Result<Shell, SafeShellError> {
        let mut shells = self.shells.lock();

        if shells.len() >= self.max_shells {
            evict_one(&mut shells)?;
        }

        let seq = self.next_shell_seq.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let now = self.clock.epoch_ms();
        let id = ShellId::new(format!("shell-{seq}"));
        let mut shell = Shell::new(id, cwd, env, now);
        shell.description = description;
        shells.insert(shell.id.clone(), shell.clone());
        Ok(shell)
    }

    /// Touch a shell's `lastActivityAt` (every successful use updates it,
    /// §4.11). No-op (returns `None`) if the shell doesn't exist.
    pub fn touch(&self, id: &ShellId) -> Option<()> {
        let mut shells = self.shells.lock();
        let now = self.clock.epoch_ms();
        let shell = shells.get_mut(id)?;
        shell.touch(now);
        Some(())
    }

    pub fn get(&self, id: &ShellId) -> Option<Shell> {
        self.shells.lock().get(id).cloned()
    }

    pub fn exists(&self, id: &ShellId) -> bool {
        self.shells.lock().contains_key(id)
    }

    /// Mutate a shell under the table lock, returning `None` if absent.
    pub fn with_shell_mut<R>(&self, id: &ShellId, f: impl FnOnce(&mut Shell) -> R) -> Option<R> {
        let mut shells = self.shells.lock();
        let shell = shells.get_mut(id)?;
        Some(f(shell))
    }

    pub fn update_shell(
        &self,
        id: &ShellId,
        cwd: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<(), SafeShellError> {
        let now = self.clock.epoch_ms();
        self.with_shell_mut(id, |shell| {
            if let Some(cwd) = cwd {
                shell.cwd = cwd;
            }
            if let Some(env) = env {
                shell.env = env;
            }
            shell.touch(now);
        })
        .ok_or_else(|| SafeShellError::not_found(format!("shell {id}")))
    }

    /// `list_shells` — all live shells, most recently active first.
    pub fn list_shells(&self) -> Vec<Shell> {
        let shells = self.shells.lock();
        let mut out: Vec<Shell> = shells.values().cloned().collect();
        out.sort_by(|a, b| b.last_activity_at_ms.cmp(&a.last_activity_at_ms));
        out
    }

    pub fn list_scripts(&self, shell_id: &ShellId, filter: &ListFilter) -> Result<Vec<Script>, SafeShellError> {
        let shells = self.shells.lock();
        let shell = shells
            .get(shell_id)
            .ok_or_else(|| SafeShellError::not_found(format!("shell {shell_id}")))?;

        let mut out: Vec<Script> = shell
            .scripts
            .values()
            .filter(|s| filter.status.map(|status| s.status == status).unwrap_or(true))
            .filter(|s| filter.background.map(|bg| s.background == bg).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.started_at_ms.cmp(&a.started_at_ms));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    pub fn list_jobs(&self, shell_id: &ShellId, filter: &ListFilter) -> Result<Vec<Job>, SafeShellError> {
        let shells = self.shells.lock();
        let shell = shells
            .get(shell_id)
            .ok_or_else(|| SafeShellError::not_found(format!("shell {shell_id}")))?;

        let mut out: Vec<Job> = shell
            .jobs
            .values()
            .filter(|j| filter.status.map(|status| j.status == status).unwrap_or(true))
            .filter(|j| filter.background.map(|bg| j.background == bg).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.started_at_ms.cmp(&a.started_at_ms));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    pub fn get_script(&self, shell_id: &ShellId, script_id: &ScriptId) -> Option<Script> {
        self.shells
            .lock()
            .get(shell_id)
            .and_then(|shell| shell.scripts.get(script_id).cloned())
    }

    /// Allocate the next `script-{shellId}-{seq}` id for `shell_id` (§3
    /// *Script*: "seq monotonic within shell").
    pub fn next_script_id(&self, shell_id: &ShellId) -> ScriptId {
        let mut seqs = self.script_seq.lock();
        let seq = seqs.entry(shell_id.clone()).or_insert(0);
        *seq += 1;
        ScriptId::new(format!("script-{shell_id}-{seq}"))
    }

    pub fn insert_script(&self, shell_id: &ShellId, script: Script) -> Result<(), SafeShellError> {
        self.with_shell_mut(shell_id, |shell| shell.insert_script(script))
            .ok_or_else(|| SafeShellError::not_found(format!("shell {shell_id}")))
    }

    /// Record the child's pid once known, keeping `scripts_by_pid` in sync
    /// (I1).
    pub fn set_script_pid(&self, shell_id: &ShellId, script_id: &ScriptId, pid: u32) {
        self.with_shell_mut(shell_id, |shell| {
            if let Some(script) = shell.scripts.get_mut(script_id) {
                script.pid = pid;
            }
            if pid != 0 {
                shell.scripts_by_pid.insert(pid, script_id.clone());
            }
        });
    }

    pub fn complete_script(&self, shell_id: &ShellId, script_id: &ScriptId, exit_code: i32, now_ms: u64) {
        self.with_shell_mut(shell_id, |shell| {
            if let Some(script) = shell.scripts.get_mut(script_id) {
                script.complete(exit_code, now_ms);
            }
        });
    }

    pub fn fail_script(&self, shell_id: &ShellId, script_id: &ScriptId, exit_code: i32, now_ms: u64) {
        self.with_shell_mut(shell_id, |shell| {
            if let Some(script) = shell.scripts.get_mut(script_id) {
                script.fail(exit_code, now_ms);
            }
        });
    }

    pub fn insert_job(&self, shell_id: &ShellId, job: Job) -> Result<(), SafeShellError> {
        self.with_shell_mut(shell_id, |shell| shell.insert_job(job))
            .ok_or_else(|| SafeShellError::not_found(format!("shell {shell_id}")))
    }

    pub fn update_job(&self, shell_id: &ShellId, job_id: &JobId, f: impl FnOnce(&mut Job)) -> Option<()> {
        self.with_shell_mut(shell_id, |shell| {
            let job = shell.jobs.get_mut(job_id)?;
            f(job);
            Some(())
        })
        .flatten()
    }

    /// Allocate live execution state for a just-spawned script (§4.10 C10).
    pub fn open_live(&self, script_id: ScriptId) -> Arc<LiveExecution> {
        let live = Arc::new(LiveExecution::new(self.output_cap_bytes));
        self.live.lock().insert(script_id, Arc::clone(&live));
        live
    }

    pub fn live(&self, script_id: &ScriptId) -> Option<Arc<LiveExecution>> {
        self.live.lock().get(script_id).cloned()
    }

    /// Fold a completed script's live buffer content back into its
    /// persisted `Script` record, wake any `waitScript` callers, and drop
    /// the live entry. Then enforce the per-shell aggregate output ceiling
    /// (§4.10: "when exceeded, the buffer eviction is resolved at the Shell
    /// Manager level").
    pub fn finalize_live(&self, shell_id: &ShellId, script_id: &ScriptId) {
        let live = self.live.lock().remove(script_id);
        if let Some(live) = &live {
            let stdout = live.stdout.lock();
            let stderr = live.stderr.lock();
            self.with_shell_mut(shell_id, |shell| {
                if let Some(script) = shell.scripts.get_mut(script_id) {
                    script.stdout = stdout.as_str();
                    script.stderr = stderr.as_str();
                    script.stdout_truncated = stdout.is_truncated();
                    script.stderr_truncated = stderr.is_truncated();
                }
            });
        }
        self.enforce_output_ceiling(shell_id);
        if let Some(live) = live {
            live.done.notify_waiters();
        }
    }

    /// Drop the oldest terminal scripts' retained stdout/stderr content
    /// (metadata is kept) until the shell's aggregate output is back under
    /// [`SHELL_OUTPUT_CEILING_BYTES`] (§4.10 aggregate ceiling).
    fn enforce_output_ceiling(&self, shell_id: &ShellId) {
        self.with_shell_mut(shell_id, |shell| loop {
            let total: usize = shell.scripts.values().map(|s| s.stdout.len() + s.stderr.len()).sum();
            if total <= SHELL_OUTPUT_CEILING_BYTES {
                break;
            }
            let oldest = shell
                .scripts
                .values()
                .filter(|s| s.status.is_terminal() && !(s.stdout.is_empty() && s.stderr.is_empty()))
                .min_by_key(|s| s.completed_at_ms.unwrap_or(s.started_at_ms))
                .map(|s| s.id.clone());
            match oldest {
                Some(id) => {
                    if let Some(script) = shell.scripts.get_mut(&id) {
                        script.stdout.clear();
                        script.stderr.clear();
                        script.stdout_truncated = true;
                        script.stderr_truncated = true;
                    }
                }
                None => break,
            }
        });
    }

    /// Seed the table from a loaded snapshot (§4.12 "On load"), before any
    /// `create_shell`/`next_script_id` call. Advances the sequence counters
    /// past the highest id already in use so freshly created ids never
    /// collide with restored ones.
    pub fn restore(&self, restored: Vec<Shell>) {
        let mut shells = self.shells.lock();
        let mut seqs = self.script_seq.lock();
        let mut max_shell_seq = 0u64;

        for shell in restored {
            max_shell_seq = max_shell_seq.max(trailing_seq(shell.id.as_str()).unwrap_or(0));
            let max_script_seq = shell
                .scripts
                .keys()
                .filter_map(|id| trailing_seq(id.as_str()))
                .max()
                .unwrap_or(0);
            seqs.insert(shell.id.clone(), max_script_seq);
            shells.insert(shell.id.clone(), shell);
        }

        drop(shells);
        drop(seqs);
        self.next_shell_seq
            .fetch_max(max_shell_seq + 1, std::sync::atomic::Ordering::SeqCst);
    }

    /// `endShell` (§4.11): the caller is responsible for killing any live
    /// runs first (the Orchestrator does this via each script's
    /// [`LiveExecution::kill`]); this removes the shell's bookkeeping and
    /// any still-present live execution entries.
    pub fn end_shell(&self, id: &ShellId) -> Result<Shell, SafeShellError> {
        let mut shells = self.shells.lock();
        let shell = shells
            .remove(id)
            .ok_or_else(|| SafeShellError::not_found(format!("shell {id}")))?;

        let mut live = self.live.lock();
        for script_id in shell.scripts.keys() {
            live.remove(script_id);
        }
        self.script_seq.lock().remove(id);
        Ok(shell)
    }
}

/// The sequence number trailing the last `-` in an id like `shell-7` or
/// `script-shell-7-3` (`3`), used to seed counters on restore.
fn trailing_seq(id: &str) -> Option<u64> {
    id.rsplit('-').next()?.parse().ok()
}

/// Evict the shell with the oldest `lastActivityAt` that has no running
/// scripts; fail `capacity-exceeded` if every shell is busy (§4.11).
fn evict_one(shells: &mut HashMap<ShellId, Shell>) -> Result<(), SafeShellError> {
    let mut candidates: Vec<&ShellId> = shells
        .iter()
        .filter(|(_, s)| !s.has_running_scripts())
        .map(|(id, _)| id)
        .collect();
    candidates.sort_by_key(|id| shells[*id].last_activity_at_ms);

    let victim = candidates.into_iter().next().cloned().ok_or_else(|| {
        SafeShellError::new(
            ErrorKind::CapacityExceeded,
            "no evictable shell: all shells have running scripts",
        )
    })?;

    shells.remove(&victim);
    Ok(())
}

#[cfg(test)]
#[path = "shell_manager_tests.rs"]
mod tests;
