// SPDX-License-Identifier: MIT

//! C14 Orchestrator (§4.14).
//!
//! Wires request -> validation -> materialization -> streaming -> recording.
//! Every public entry point opens a tracing span, delegates to an `_inner`
//! twin, and logs elapsed time plus outcome — the same
//! span-wrapped-`execute_inner` shape this workspace's effect executor uses.

use crate::config::Config;
use crate::login_path::LoginShellPath;
use crate::retry_manager::RetryManager;
use crate::shell_manager::{ListFilter, ShellManager};
use parking_lot::Mutex;
use safeshell_core::{
    BlockedReason, Clock, ErrorKind, Job, PendingRetry, PersistedScript, PersistedShell,
    PersistedState, RetryId, SafeShellError, Script, ScriptId, ScriptStatus, Shell, ShellId,
    SystemClock, MAX_PENDING_RETRIES, MAX_SHELLS, OUTPUT_BUFFER_CAP_BYTES, PENDING_RETRY_TTL,
    SNAPSHOT_SCRIPT_HISTORY,
};
use safeshell_runtime::{
    content_hash, generate_preamble, materialize, spawn_streaming, ChildSpec, PreambleContext,
    RunOutcome, StreamEvent, StreamingRun,
};
use safeshell_sandbox::{
    build_child_env, matches_pattern, validate_command, CommandValidation, EnvContext,
    PathContext, PolicyStore,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Options accepted by `exec` (§6).
#[derive(Debug, Clone, Default)]
pub struct ExecOpts {
    pub background: bool,
    pub timeout: Option<Duration>,
    pub env: Option<HashMap<String, String>>,
}

/// Options accepted by `run` (§6).
#[derive(Debug, Clone, Default)]
pub struct RunOpts {
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// The `exec`/`run`/`task`/`retry` result shape (§6 "exec-result shape").
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    Foreground {
        stdout: String,
        stderr: String,
        code: i32,
        success: bool,
        script_id: ScriptId,
    },
    Background {
        script_id: ScriptId,
        pid: u32,
        shell_id: ShellId,
    },
}

/// `getScriptOutput` result shape (§6).
#[derive(Debug, Clone)]
pub struct ScriptOutputView {
    pub stdout: String,
    pub stderr: String,
    pub offset: u64,
    pub status: ScriptStatus,
    pub exit_code: Option<i32>,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

/// Everything needed to (re)build and write a snapshot, held as cheaply
/// cloneable `Arc`s so a debounced write can run as a detached task without
/// borrowing the `Orchestrator` itself (§4.12 "debounced writes").
#[derive(Clone)]
struct PersistContext {
    config: Config,
    clock: Arc<dyn Clock>,
    shells: Arc<ShellManager>,
    session_allowed: Arc<Mutex<HashSet<String>>>,
    generation: Arc<AtomicU64>,
}

impl PersistContext {
    fn snapshot(&self) -> PersistedState {
        let now = self.clock.epoch_ms();
        let mut state = PersistedState::new(self.config.project_dir.clone(), now);

        for shell in self.shells.list_shells() {
            state.shells.insert(
                shell.id.clone(),
                PersistedShell {
                    id: shell.id.clone(),
                    description: shell.description.clone(),
                    cwd: shell.cwd.clone(),
                    env: shell.env.clone(),
                    vars: shell.vars.clone(),
                    created_at_ms: shell.created_at_ms,
                    last_activity_at_ms: shell.last_activity_at_ms,
                },
            );
            for script in shell.scripts.values() {
                state.scripts.insert(
                    script.id.clone(),
                    PersistedScript {
                        id: script.id.clone(),
                        shell_id: shell.id.clone(),
                        code: script.code.clone(),
                        pid: script.pid,
                        status: script.status,
                        exit_code: script.exit_code,
                        started_at_ms: script.started_at_ms,
                        completed_at_ms: script.completed_at_ms,
                        background: script.background,
                    },
                );
            }
        }

        state.session_allowed_commands = self.session_allowed.lock().iter().cloned().collect();
        safeshell_storage::prune_terminal_scripts(&mut state, SNAPSHOT_SCRIPT_HISTORY);
        state
    }

    /// Schedule a write after the debounce window, skipped if a newer
    /// request has since superseded it (§4.12 "coalesce bursts").
    fn request(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let ctx = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(safeshell_core::PERSIST_DEBOUNCE).await;
            if ctx.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            let state = ctx.snapshot();
            if let Err(e) = safeshell_storage::save(&state, &ctx.config.snapshot_path) {
                tracing::error!(error = %e, "debounced snapshot write failed");
            }
        });
    }

    /// Write immediately, bypassing the debounce (process shutdown).
    fn flush(&self) -> Result<(), SafeShellError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let state = self.snapshot();
        safeshell_storage::save(&state, &self.config.snapshot_path)
            .map_err(|e| SafeShellError::internal(format!("snapshot save: {e}")))
    }
}

/// C14 Orchestrator: the service's entry points (§4.14, §6).
pub struct Orchestrator {
    clock: Arc<dyn Clock>,
    config: Config,
    login_path: LoginShellPath,
    policy: PolicyStore,
    shells: Arc<ShellManager>,
    retries: RetryManager,
    session_allowed: Arc<Mutex<HashSet<String>>>,
    persist: PersistContext,
}

impl Orchestrator {
    /// Construct against a project directory, loading policy and any
    /// existing snapshot (§4.12 "On load").
    pub fn new(project_dir: impl Into<PathBuf>) -> Result<Self, SafeShellError> {
        Self::with_clock(Config::for_project(project_dir), Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self, SafeShellError> {
        let policy_config = config.load_policy()?;
        let ctx = PathContext {
            cwd: config.project_dir.clone(),
            home: dirs::home_dir().unwrap_or_else(|| config.project_dir.clone()),
        };
        let policy = PolicyStore::load(policy_config, &ctx)?;
        for diagnostic in &policy.diagnostics {
            tracing::warn!(message = %diagnostic.message, "policy validation diagnostic");
        }

        let shells = Arc::new(ShellManager::new(
            Arc::clone(&clock),
            MAX_SHELLS,
            OUTPUT_BUFFER_CAP_BYTES,
        ));
        let retries = RetryManager::new(
            Arc::clone(&clock),
            MAX_PENDING_RETRIES,
            PENDING_RETRY_TTL.as_millis() as u64,
        );

        let now = clock.epoch_ms();
        let mut session_allowed_set = HashSet::new();
        match safeshell_storage::load(&config.snapshot_path) {
            Ok(Some(mut snapshot)) => {
                safeshell_storage::reap_stale_pids(&mut snapshot, now);
                safeshell_storage::prune_terminal_scripts(&mut snapshot, SNAPSHOT_SCRIPT_HISTORY);
                session_allowed_set.extend(snapshot.session_allowed_commands.iter().cloned());
                shells.restore(rebuild_shells(snapshot));
            }
            Ok(None) => {}
            Err(e) => {
                return Err(SafeShellError::internal(format!("loading snapshot: {e}")));
            }
        }

        let session_allowed = Arc::new(Mutex::new(session_allowed_set));
        let persist = PersistContext {
            config: config.clone(),
            clock: Arc::clone(&clock),
            shells: Arc::clone(&shells),
            session_allowed: Arc::clone(&session_allowed),
            generation: Arc::new(AtomicU64::new(0)),
        };

        Ok(Self {
            clock,
            config,
            login_path: LoginShellPath::new(),
            policy,
            shells,
            retries,
            session_allowed,
            persist,
        })
    }

    /// Force an immediate snapshot write. Callers (the CLI's `main`, tests)
    /// should call this before exiting so a debounce window doesn't get cut
    /// short by process exit (§9 "explicit init and shutdown hooks").
    pub fn flush(&self) -> Result<(), SafeShellError> {
        self.persist.flush()
    }

    fn path_ctx(&self) -> PathContext {
        PathContext {
            cwd: self.config.project_dir.clone(),
            home: dirs::home_dir().unwrap_or_else(|| self.config.project_dir.clone()),
        }
    }

    fn build_env(
        &self,
        shell: &Shell,
        script_id: Option<&str>,
        extra: Option<&HashMap<String, String>>,
    ) -> HashMap<String, String> {
        let process_env: HashMap<String, String> = std::env::vars().collect();
        let mut shell_env = shell.env.clone();
        if let Some(extra) = extra {
            for (k, v) in extra {
                shell_env.insert(k.clone(), v.clone());
            }
        }
        let ctx = EnvContext {
            shell_id: shell.id.as_str(),
            script_id,
            login_shell_path: self.login_path.get(),
        };
        build_child_env(&process_env, &shell_env, &self.policy.resolved.env, &ctx)
    }

    /// `shellId?` resolution shared by `exec`/`run`/`task`: an explicit id
    /// must already exist; omission creates a fresh ephemeral shell scoped
    /// to this call (the operations surface requires *some* shell context
    /// to resolve cwd/env against).
    fn resolve_shell(&self, shell_id: Option<ShellId>) -> Result<ShellId, SafeShellError> {
        match shell_id {
            Some(id) if self.shells.exists(&id) => Ok(id),
            Some(id) => Err(SafeShellError::not_found(format!("shell {id}"))),
            None => {
                let shell = self.shells.create_shell(
                    self.config.project_dir.clone(),
                    HashMap::new(),
                    Some("ephemeral".to_string()),
                )?;
                Ok(shell.id)
            }
        }
    }

    // ---- Shell lifecycle (§4.11) ----------------------------------------

    pub fn start_shell(
        &self,
        cwd: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Shell, SafeShellError> {
        let cwd = cwd.unwrap_or_else(|| self.config.project_dir.clone());
        let shell = self.shells.create_shell(cwd, env.unwrap_or_default(), None)?;
        self.persist.request();
        Ok(shell)
    }

    pub fn update_shell(
        &self,
        shell_id: &ShellId,
        cwd: Option<PathBuf>,
        env: Option<HashMap<String, String>>,
    ) -> Result<(), SafeShellError> {
        self.shells.update_shell(shell_id, cwd, env)?;
        self.persist.request();
        Ok(())
    }

    /// `endShell`: kill every still-running Script first (§4.11 "for every
    /// running Script of that shell, run the Runtime's termination").
    pub async fn end_shell(&self, shell_id: &ShellId) -> Result<(), SafeShellError> {
        if let Some(shell) = self.shells.get(shell_id) {
            for script in shell.scripts.values().filter(|s| !s.status.is_terminal()) {
                if let Some(live) = self.shells.live(&script.id) {
                    live.kill().await;
                }
            }
        }
        self.shells.end_shell(shell_id)?;
        self.persist.request();
        Ok(())
    }

    pub fn list_shells(&self) -> Vec<Shell> {
        self.shells.list_shells()
    }

    pub fn list_scripts(
        &self,
        shell_id: &ShellId,
        filter: &ListFilter,
    ) -> Result<Vec<Script>, SafeShellError> {
        self.shells.touch(shell_id);
        self.shells.list_scripts(shell_id, filter)
    }

    /// Jobs are only ever populated by a callback from the child runtime's
    /// standard library — out of scope per §1 — so in this service's own
    /// end-to-end flow the list is always empty; the data model and index
    /// are kept complete so that collaborator has somewhere to report into.
    pub fn list_jobs(&self, shell_id: &ShellId, filter: &ListFilter) -> Result<Vec<Job>, SafeShellError> {
        self.shells.touch(shell_id);
        self.shells.list_jobs(shell_id, filter)
    }

    // ---- exec/run/task (§4.14) ------------------------------------------

    pub async fn exec(
        &self,
        shell_id: Option<ShellId>,
        code: String,
        opts: ExecOpts,
    ) -> Result<ExecOutcome, SafeShellError> {
        let shell_id = self.resolve_shell(shell_id)?;
        let span = tracing::info_span!("exec", shell_id = %shell_id, background = opts.background);
        let _guard = span.enter();
        let start = Instant::now();
        let result = self.exec_inner(shell_id, code, opts).await;
        log_outcome("exec", start, &result);
        result
    }

    async fn exec_inner(
        &self,
        shell_id: ShellId,
        code: String,
        opts: ExecOpts,
    ) -> Result<ExecOutcome, SafeShellError> {
        self.shells.touch(&shell_id);
        let shell = self
            .shells
            .get(&shell_id)
            .ok_or_else(|| SafeShellError::not_found(format!("shell {shell_id}")))?;

        if let Some(spec) = first_blocked_import(&code, &self.policy.resolved.policy.imports) {
            let retry_id = self.retries.create(
                code,
                None,
                shell_id,
                HashMap::new(),
                BlockedReason::Import { blocked_import: spec.clone() },
            );
            return Err(SafeShellError::new(
                ErrorKind::ImportBlocked,
                format!("import '{spec}' is blocked"),
            )
            .with_retry(retry_id.as_str()));
        }

        let allowed_commands: Vec<String> =
            self.policy.resolved.all_allowed_commands.iter().cloned().collect();
        let preamble = generate_preamble(&PreambleContext {
            shell_id: shell_id.as_str(),
            cwd: &shell.cwd.to_string_lossy(),
            vars: &shell.vars,
            allowed_commands: &allowed_commands,
        });
        let script_path = materialize(&self.config.scripts_dir, &preamble.text, &code, "")
            .map_err(|e| SafeShellError::internal(format!("materializing script: {e}")))?;
        let _ = content_hash(&preamble.text, &code, "");

        let script_id = self.shells.next_script_id(&shell_id);
        let env = self.build_env(&shell, Some(script_id.as_str()), opts.env.as_ref());
        let timeout = opts.timeout.unwrap_or(self.policy.resolved.timeout);

        let now = self.clock.epoch_ms();
        let script = Script::new_running(script_id.clone(), code, 0, opts.background, now);
        self.shells.insert_script(&shell_id, script)?;
        self.shells.open_live(script_id.clone());

        let spec = ChildSpec {
            program: "node".to_string(),
            args: vec![script_path.to_string_lossy().into_owned()],
            cwd: shell.cwd.clone(),
            env,
        };

        self.spawn_and_record(shell_id, script_id, spec, timeout, opts.background)
            .await
    }

    pub async fn run(
        &self,
        shell_id: Option<ShellId>,
        cmd: String,
        args: Vec<String>,
        opts: RunOpts,
    ) -> Result<ExecOutcome, SafeShellError> {
        let shell_id = self.resolve_shell(shell_id)?;
        let span = tracing::info_span!("run", shell_id = %shell_id, command = %cmd);
        let _guard = span.enter();
        let start = Instant::now();
        let result = self.run_inner(shell_id, cmd, args, opts).await;
        log_outcome("run", start, &result);
        result
    }

    async fn run_inner(
        &self,
        shell_id: ShellId,
        cmd: String,
        args: Vec<String>,
        opts: RunOpts,
    ) -> Result<ExecOutcome, SafeShellError> {
        self.shells.touch(&shell_id);
        let shell = self
            .shells
            .get(&shell_id)
            .ok_or_else(|| SafeShellError::not_found(format!("shell {shell_id}")))?;

        let path_ctx = self.path_ctx();
        let session_allowed = self.session_allowed.lock().clone();
        if let CommandValidation::Blocked(err) =
            validate_command(&cmd, &args, &self.policy.resolved, &session_allowed, &path_ctx)
        {
            let code = join_command(&cmd, &args);
            let retry_id = self.retries.create(
                code,
                None,
                shell_id,
                HashMap::new(),
                BlockedReason::Command { blocked_command: cmd },
            );
            return Err(err.with_retry(retry_id.as_str()));
        }

        let script_id = self.shells.next_script_id(&shell_id);
        let env = self.build_env(&shell, Some(script_id.as_str()), None);
        let timeout = opts.timeout.unwrap_or(self.policy.resolved.timeout);
        let cwd = opts.cwd.unwrap_or_else(|| shell.cwd.clone());

        let now = self.clock.epoch_ms();
        let script = Script::new_running(script_id.clone(), join_command(&cmd, &args), 0, false, now);
        self.shells.insert_script(&shell_id, script)?;
        self.shells.open_live(script_id.clone());

        let spec = ChildSpec { program: cmd, args, cwd, env };
        self.spawn_and_record(shell_id, script_id, spec, timeout, false).await
    }

    pub async fn task(&self, shell_id: Option<ShellId>, name: String) -> Result<ExecOutcome, SafeShellError> {
        let shell_id = self.resolve_shell(shell_id)?;
        let span = tracing::info_span!("task", shell_id = %shell_id, task = %name);
        let _guard = span.enter();
        let start = Instant::now();
        let result = self.run_task(shell_id, name, HashSet::new()).await;
        log_outcome("task", start, &result);
        result
    }

    /// Resolve and run a named task: aliases chase transitively (cycle
    /// detection via `visited`), `parallel`/`serial` compose sub-tasks,
    /// otherwise the leaf `cmd`/`args` form is dispatched through `run`
    /// (§4.14 "task", §9 "cyclic task references").
    fn run_task<'a>(
        &'a self,
        shell_id: ShellId,
        name: String,
        visited: HashSet<String>,
    ) -> Pin<Box<dyn Future<Output = Result<ExecOutcome, SafeShellError>> + Send + 'a>> {
        Box::pin(async move {
            if visited.contains(&name) {
                return Err(SafeShellError::new(
                    ErrorKind::ConfigInvalid,
                    format!("task cycle detected at '{name}'"),
                ));
            }
            let def = self
                .policy
                .resolved
                .tasks
                .get(&name)
                .cloned()
                .ok_or_else(|| SafeShellError::not_found(format!("task '{name}'")))?;

            let mut visited = visited;
            visited.insert(name.clone());

            match def {
                safeshell_core::TaskDef::Inline(code) => {
                    self.exec(Some(shell_id), code, ExecOpts::default()).await
                }
                safeshell_core::TaskDef::Full(spec) => {
                    if let Some(alias) = spec.alias {
                        return self.run_task(shell_id, alias, visited).await;
                    }
                    if !spec.parallel.is_empty() {
                        let futures_iter = spec
                            .parallel
                            .into_iter()
                            .map(|sub| self.run_task(shell_id.clone(), sub, visited.clone()));
                        let results = futures::future::join_all(futures_iter).await;
                        return combine_parallel(results);
                    }
                    if !spec.serial.is_empty() {
                        return self.run_serial(shell_id, spec.serial, visited).await;
                    }
                    let cmd = spec.cmd.ok_or_else(|| {
                        SafeShellError::new(
                            ErrorKind::ConfigInvalid,
                            format!("task '{name}' has no cmd, alias, parallel, or serial"),
                        )
                    })?;
                    let cwd = spec.cwd.map(PathBuf::from);
                    self.run(Some(shell_id), cmd, spec.args, RunOpts { cwd, timeout: None }).await
                }
            }
        })
    }

    async fn run_serial(
        &self,
        shell_id: ShellId,
        names: Vec<String>,
        visited: HashSet<String>,
    ) -> Result<ExecOutcome, SafeShellError> {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut last_id = None;
        for sub in names {
            let outcome = self.run_task(shell_id.clone(), sub, visited.clone()).await?;
            let (o, e, success, code, id) = outcome_parts(&outcome);
            stdout.push_str(&o);
            stderr.push_str(&e);
            last_id = Some(id);
            if !success {
                return Ok(ExecOutcome::Foreground { stdout, stderr, code, success: false, script_id: last_id.unwrap() });
            }
        }
        let script_id = last_id.ok_or_else(|| SafeShellError::internal("empty serial task list"))?;
        Ok(ExecOutcome::Foreground { stdout, stderr, code: 0, success: true, script_id })
    }

    /// Consume the retry entry and re-issue it, treating the call itself as
    /// the out-of-band approval signal: the blocked command is added to
    /// this process's session-allowed set before the original operation is
    /// retried (§4.13 `consume`, SPEC_FULL.md §C "Session allowed
    /// commands").
    pub async fn retry(&self, retry_id: &RetryId) -> Result<ExecOutcome, SafeShellError> {
        let span = tracing::info_span!("retry", retry_id = %retry_id);
        let _guard = span.enter();
        let start = Instant::now();
        let result = self.retry_inner(retry_id).await;
        log_outcome("retry", start, &result);
        result
    }

    async fn retry_inner(&self, retry_id: &RetryId) -> Result<ExecOutcome, SafeShellError> {
        let entry: PendingRetry = self
            .retries
            .consume(retry_id)
            .ok_or_else(|| SafeShellError::not_found(format!("retry {retry_id}")))?;

        match &entry.reason {
            BlockedReason::Command { blocked_command } => {
                self.session_allowed.lock().insert(blocked_command.clone());
            }
            BlockedReason::Commands { blocked_commands, .. } => {
                let mut allowed = self.session_allowed.lock();
                for cmd in blocked_commands {
                    allowed.insert(cmd.clone());
                }
            }
            BlockedReason::Import { .. } | BlockedReason::Host { .. } => {}
        }
        self.persist.request();

        match entry.reason {
            BlockedReason::Command { .. } | BlockedReason::Commands { .. } => {
                let mut parts = entry.code.split_whitespace();
                let cmd = parts
                    .next()
                    .ok_or_else(|| SafeShellError::internal("pending retry has empty code"))?
                    .to_string();
                let args = parts.map(str::to_string).collect();
                self.run(Some(entry.shell_id), cmd, args, RunOpts::default()).await
            }
            BlockedReason::Import { .. } => {
                self.exec(Some(entry.shell_id), entry.code, ExecOpts::default()).await
            }
            BlockedReason::Host { .. } => Err(SafeShellError::new(
                ErrorKind::Internal,
                "host-blocked retries are not constructed by this service (network enforcement \
                 happens in the child runtime, §1 non-goals)",
            )),
        }
    }

    // ---- Streaming / output (§4.9, §4.10) -------------------------------

    async fn spawn_and_record(
        &self,
        shell_id: ShellId,
        script_id: ScriptId,
        spec: ChildSpec,
        timeout: Duration,
        background: bool,
    ) -> Result<ExecOutcome, SafeShellError> {
        let run = spawn_streaming(spec, timeout)?;
        let pid = run.pid;

        let handle = tokio::spawn(drain_and_record(
            Arc::clone(&self.clock),
            Arc::clone(&self.shells),
            self.persist.clone(),
            shell_id.clone(),
            script_id.clone(),
            run,
        ));

        if background {
            self.persist.request();
            return Ok(ExecOutcome::Background { script_id, pid, shell_id });
        }

        let _ = handle.await;
        self.persist.request();
        let script = self
            .shells
            .get_script(&shell_id, &script_id)
            .ok_or_else(|| SafeShellError::internal("script record vanished after completion"))?;
        Ok(ExecOutcome::Foreground {
            stdout: script.stdout,
            stderr: script.stderr,
            code: script.exit_code.unwrap_or(-1),
            success: script.status == ScriptStatus::Completed,
            script_id: script.id,
        })
    }

    pub fn get_script_output(
        &self,
        shell_id: &ShellId,
        script_id: &ScriptId,
        since: Option<u64>,
    ) -> Result<ScriptOutputView, SafeShellError> {
        self.shells.touch(shell_id);
        if let Some(live) = self.shells.live(script_id) {
            let offset = since.unwrap_or(0);
            let stdout = live.stdout.lock().read(offset);
            let stderr = live.stderr.lock().read(offset);
            let script = self
                .shells
                .get_script(shell_id, script_id)
                .ok_or_else(|| SafeShellError::not_found(format!("script {script_id}")))?;
            return Ok(ScriptOutputView {
                offset: stdout.offset.max(stderr.offset),
                stdout: stdout.data,
                stderr: stderr.data,
                status: script.status,
                exit_code: script.exit_code,
                stdout_truncated: stdout.truncated,
                stderr_truncated: stderr.truncated,
            });
        }

        let script = self
            .shells
            .get_script(shell_id, script_id)
            .ok_or_else(|| SafeShellError::not_found(format!("script {script_id}")))?;
        Ok(ScriptOutputView {
            stdout: script.stdout,
            stderr: script.stderr,
            offset: 0,
            status: script.status,
            exit_code: script.exit_code,
            stdout_truncated: script.stdout_truncated,
            stderr_truncated: script.stderr_truncated,
        })
    }

    /// Block until the script reaches a terminal state, or the deadline
    /// elapses (§6 `waitScript`).
    pub async fn wait_script(
        &self,
        shell_id: &ShellId,
        script_id: &ScriptId,
        timeout: Option<Duration>,
    ) -> Result<Script, SafeShellError> {
        loop {
            let Some(live) = self.shells.live(script_id) else {
                return self
                    .shells
                    .get_script(shell_id, script_id)
                    .ok_or_else(|| SafeShellError::not_found(format!("script {script_id}")));
            };
            // Register for the notification before re-checking status, so a
            // completion that races this check is never missed.
            let notified = live.done.notified();
            if let Some(script) = self.shells.get_script(shell_id, script_id) {
                if script.status.is_terminal() {
                    return Ok(script);
                }
            } else {
                return Err(SafeShellError::not_found(format!("script {script_id}")));
            }

            match timeout {
                Some(d) => {
                    if tokio::time::timeout(d, notified).await.is_err() {
                        return Err(SafeShellError::new(ErrorKind::Timeout, "waitScript deadline elapsed"));
                    }
                }
                None => notified.await,
            }
        }
    }

    pub async fn kill_script(&self, shell_id: &ShellId, script_id: &ScriptId) -> Result<(), SafeShellError> {
        self.shells.touch(shell_id);
        match self.shells.live(script_id) {
            Some(live) => {
                live.kill().await;
                Ok(())
            }
            None => {
                let script = self
                    .shells
                    .get_script(shell_id, script_id)
                    .ok_or_else(|| SafeShellError::not_found(format!("script {script_id}")))?;
                if script.status.is_terminal() {
                    Ok(())
                } else {
                    Err(SafeShellError::internal("script has no live execution handle"))
                }
            }
        }
    }
}

/// Drain a spawned child's events into its live buffers, wire the kill
/// switch, and record the final outcome once the drain completes
/// (§4.9 C9, §4.10 C10, §5 "Cancellation").
async fn drain_and_record(
    clock: Arc<dyn Clock>,
    shells: Arc<ShellManager>,
    persist: PersistContext,
    shell_id: ShellId,
    script_id: ScriptId,
    mut run: StreamingRun,
) {
    shells.set_script_pid(&shell_id, &script_id, run.pid);
    let live = shells.live(&script_id);
    let (kill_tx, mut kill_rx) = mpsc::channel(1);
    if let Some(live) = &live {
        live.set_kill_switch(kill_tx);
    }

    loop {
        tokio::select! {
            event = run.events.recv() => {
                match event {
                    Some(StreamEvent::Stdout(chunk)) => {
                        if let Some(live) = &live {
                            live.stdout.lock().append(&chunk);
                        }
                    }
                    Some(StreamEvent::Stderr(chunk)) => {
                        if let Some(live) = &live {
                            live.stderr.lock().append(&chunk);
                        }
                    }
                    Some(StreamEvent::Exit(_)) => {}
                    None => break,
                }
            }
            Some(()) = kill_rx.recv() => {
                run.kill();
            }
        }
    }

    let now = clock.epoch_ms();
    match run.join().await {
        Ok(RunOutcome::Exited(code)) => shells.complete_script(&shell_id, &script_id, code, now),
        Ok(RunOutcome::Killed) => shells.fail_script(&shell_id, &script_id, -1, now),
        Err(_) => shells.fail_script(&shell_id, &script_id, -1, now),
    }
    shells.finalize_live(&shell_id, &script_id);
    persist.request();
}

fn log_outcome<T>(op: &'static str, start: Instant, result: &Result<T, SafeShellError>) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(_) => tracing::info!(op, elapsed_ms, "completed"),
        Err(e) => tracing::error!(op, elapsed_ms, error = %e, "failed"),
    }
}

fn join_command(cmd: &str, args: &[String]) -> String {
    if args.is_empty() {
        cmd.to_string()
    } else {
        format!("{cmd} {}", args.join(" "))
    }
}

fn outcome_parts(outcome: &ExecOutcome) -> (String, String, bool, i32, ScriptId) {
    match outcome {
        ExecOutcome::Foreground { stdout, stderr, code, success, script_id } => {
            (stdout.clone(), stderr.clone(), *success, *code, script_id.clone())
        }
        ExecOutcome::Background { script_id, .. } => (String::new(), String::new(), true, 0, script_id.clone()),
    }
}

fn combine_parallel(results: Vec<Result<ExecOutcome, SafeShellError>>) -> Result<ExecOutcome, SafeShellError> {
    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut worst_code = 0;
    let mut success = true;
    let mut last_id = None;

    for result in results {
        let outcome = result?;
        let (o, e, s, c, id) = outcome_parts(&outcome);
        stdout.push_str(&o);
        stderr.push_str(&e);
        if !s {
            success = false;
            worst_code = worst_code.max(c);
        }
        last_id = Some(id);
    }

    Ok(ExecOutcome::Foreground {
        stdout,
        stderr,
        code: if success { 0 } else { worst_code },
        success,
        script_id: last_id.ok_or_else(|| SafeShellError::internal("empty parallel task list"))?,
    })
}

/// Group a loaded snapshot's flat script map back under their owning shells
/// (§4.12 "On load").
fn rebuild_shells(snapshot: PersistedState) -> Vec<Shell> {
    let mut shells: HashMap<ShellId, Shell> = snapshot
        .shells
        .into_iter()
        .map(|(id, persisted)| {
            let mut shell = Shell::new(id.clone(), persisted.cwd, persisted.env, persisted.created_at_ms);
            shell.description = persisted.description;
            shell.vars = persisted.vars;
            shell.last_activity_at_ms = persisted.last_activity_at_ms;
            (id, shell)
        })
        .collect();

    for (_, persisted) in snapshot.scripts {
        if let Some(shell) = shells.get_mut(&persisted.shell_id) {
            let mut script = Script::new_running(
                persisted.id,
                persisted.code,
                persisted.pid,
                persisted.background,
                persisted.started_at_ms,
            );
            script.status = persisted.status;
            script.exit_code = persisted.exit_code;
            script.completed_at_ms = persisted.completed_at_ms;
            if let Some(completed) = persisted.completed_at_ms {
                script.duration_ms = Some(completed.saturating_sub(persisted.started_at_ms));
            }
            shell.insert_script(script);
        }
    }

    shells.into_values().collect()
}

/// Scan `code` for `require('spec')`/`from 'spec'`-shaped tokens and return
/// the first one matching `imports.blocked` that isn't explicitly exempted
/// by `imports.trusted` or `imports.allowed` (§4.7, §9 "In-child
/// re-validation" — this is the Orchestrator-side first pass; the preamble
/// carries the same policy for the child's own check). `trusted` and
/// `allowed` both override a `blocked` match; they differ only in that an
/// overlap between `trusted` and `blocked` is surfaced as a policy-load
/// diagnostic (§4.3) as a deliberate-override signal, while `allowed` is a
/// plain additional allow-list with no such warning (§C "Import exemptions").
fn first_blocked_import(code: &str, imports: &safeshell_core::ImportsPolicy) -> Option<String> {
    for specifier in extract_import_specifiers(code) {
        let exempt = imports.trusted.iter().any(|p| matches_pattern(p, &specifier))
            || imports.allowed.iter().any(|p| matches_pattern(p, &specifier));
        if exempt {
            continue;
        }
        if imports.blocked.iter().any(|p| matches_pattern(p, &specifier)) {
            return Some(specifier);
        }
    }
    None
}

fn extract_import_specifiers(code: &str) -> Vec<String> {
    let mut out = Vec::new();
    for marker in ["require(", "from "] {
        let mut cursor = 0;
        while let Some(pos) = code[cursor..].find(marker) {
            let start = cursor + pos + marker.len();
            if let Some(spec) = extract_quoted(&code[start..]) {
                out.push(spec);
            }
            cursor = start;
        }
    }
    out
}

fn extract_quoted(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    let quote = rest.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let body = &rest[1..];
    let end = body.find(quote)?;
    Some(body[..end].to_string())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
