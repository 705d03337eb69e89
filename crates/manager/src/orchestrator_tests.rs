// SPDX-License-Identifier: MIT

use super::*;
use safeshell_core::FakeClock;
use tempfile::TempDir;

/// Builds an Orchestrator over a fresh temp project with a `permissive`
/// policy (so `echo`/`sleep`/`false` are pre-whitelisted) and a fixed clock.
/// `exec`'s `node`-backed path is exercised at the Streaming Runtime layer
/// instead of here, since this workspace doesn't assume a `node` binary is
/// on the test machine's PATH the way `echo`/`sleep`/`false` are.
fn test_orchestrator(policy_toml: &str) -> (Orchestrator, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let state_dir = dir.path().join(".safeshell");
    std::fs::create_dir_all(&state_dir).expect("mkdir state dir");
    std::fs::write(state_dir.join("policy.toml"), policy_toml).expect("write policy");

    let config = Config::for_project(dir.path());
    let clock = Arc::new(FakeClock::new(1_000));
    let orchestrator = Orchestrator::with_clock(config, clock).expect("construct orchestrator");
    (orchestrator, dir)
}

fn permissive() -> (Orchestrator, TempDir) {
    test_orchestrator("preset = \"permissive\"\n")
}

#[tokio::test]
async fn run_whitelisted_command_succeeds_in_foreground() {
    let (orch, _dir) = permissive();
    let outcome = orch
        .run(None, "echo".to_string(), vec!["hello".to_string()], RunOpts::default())
        .await
        .expect("run succeeds");
    match outcome {
        ExecOutcome::Foreground { stdout, success, code, .. } => {
            assert_eq!(stdout.trim(), "hello");
            assert!(success);
            assert_eq!(code, 0);
        }
        ExecOutcome::Background { .. } => panic!("expected foreground outcome"),
    }
}

#[tokio::test]
async fn run_non_whitelisted_command_is_blocked_with_retry() {
    let (orch, _dir) = test_orchestrator("preset = \"strict\"\n");
    let err = orch
        .run(None, "git".to_string(), vec!["status".to_string()], RunOpts::default())
        .await
        .expect_err("git is not whitelisted under strict");
    assert_eq!(err.kind, ErrorKind::CommandBlocked);
    assert!(err.retry.is_some());
}

#[tokio::test]
async fn retry_adds_command_to_session_allowed_and_reissues() {
    let (orch, _dir) = test_orchestrator("preset = \"strict\"\n");
    let blocked = orch
        .run(None, "echo".to_string(), vec!["hi".to_string()], RunOpts::default())
        .await
        .expect_err("echo is not whitelisted under strict");
    let retry_id = RetryId::new(blocked.retry.expect("retry info").retry_id);

    let outcome = orch.retry(&retry_id).await.expect("retry reissues");
    match outcome {
        ExecOutcome::Foreground { stdout, success, .. } => {
            assert_eq!(stdout.trim(), "hi");
            assert!(success);
        }
        ExecOutcome::Background { .. } => panic!("expected foreground outcome"),
    }

    // A second call with the same command no longer needs approval.
    let second = orch
        .run(None, "echo".to_string(), vec!["again".to_string()], RunOpts::default())
        .await
        .expect("command now session-allowed");
    assert!(matches!(second, ExecOutcome::Foreground { success: true, .. }));
}

#[tokio::test]
async fn retry_of_unknown_id_is_not_found() {
    let (orch, _dir) = permissive();
    let err = orch.retry(&RetryId::new("retry-missing")).await.expect_err("no such retry");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn run_against_explicit_shell_scopes_the_script_id() {
    let (orch, _dir) = permissive();
    let shell = orch.start_shell(None, None).expect("start shell");

    let outcome = orch
        .run(Some(shell.id.clone()), "sleep".to_string(), vec!["0.01".to_string()], RunOpts::default())
        .await
        .expect("run succeeds");
    // `run` has no background flag of its own (only `exec` does); assert the
    // foreground path still reports the script against the right shell.
    match outcome {
        ExecOutcome::Foreground { script_id, success, .. } => {
            assert!(success);
            assert!(script_id.as_str().starts_with(&format!("script-{}-", shell.id)));
        }
        ExecOutcome::Background { .. } => panic!("run always awaits completion"),
    }
}

#[tokio::test]
async fn wait_script_blocks_until_terminal_then_returns_immediately() {
    let (orch, _dir) = permissive();
    let shell = orch.start_shell(None, None).expect("start shell");
    let outcome = orch
        .run(Some(shell.id.clone()), "echo".to_string(), vec!["done".to_string()], RunOpts::default())
        .await
        .expect("run succeeds");
    let script_id = match outcome {
        ExecOutcome::Foreground { script_id, .. } => script_id,
        ExecOutcome::Background { .. } => unreachable!(),
    };

    let script = orch.wait_script(&shell.id, &script_id, None).await.expect("wait succeeds");
    assert!(script.status.is_terminal());
}

#[tokio::test]
async fn wait_script_times_out_on_a_still_running_script() {
    let (orch, _dir) = permissive();
    let shell = orch.start_shell(None, None).expect("start shell");
    let script_id = orch.shells.next_script_id(&shell.id);
    let now = orch.clock.epoch_ms();
    let script = Script::new_running(script_id.clone(), "sleep 5".into(), 0, true, now);
    orch.shells.insert_script(&shell.id, script).expect("insert");
    orch.shells.open_live(script_id.clone());

    let err = orch
        .wait_script(&shell.id, &script_id, Some(Duration::from_millis(50)))
        .await
        .expect_err("deadline elapses");
    assert_eq!(err.kind, ErrorKind::Timeout);
}

#[tokio::test]
async fn kill_script_terminates_a_running_child() {
    let (orch, _dir) = permissive();
    let orch = Arc::new(orch);
    let shell = orch.start_shell(None, None).expect("start shell");

    // Kick the run off on a detached task (needs its own Arc handle to
    // outlive this function's stack frame) so we can kill it mid-flight.
    let spawned = Arc::clone(&orch);
    let shell_id = shell.id.clone();
    let run_handle = tokio::spawn(async move {
        spawned.run(Some(shell_id), "sleep".to_string(), vec!["5".to_string()], RunOpts::default()).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let scripts = orch
        .list_scripts(&shell.id, &ListFilter::default())
        .expect("list scripts");
    let running = scripts.iter().find(|s| !s.status.is_terminal()).expect("one running script");
    orch.kill_script(&shell.id, &running.id).await.expect("kill succeeds");

    let result = run_handle.await.expect("join");
    match result.expect("run completes after kill") {
        ExecOutcome::Foreground { success, .. } => assert!(!success),
        ExecOutcome::Background { .. } => unreachable!(),
    }
}

#[tokio::test]
async fn end_shell_kills_running_scripts_first() {
    let (orch, _dir) = permissive();
    let shell = orch.start_shell(None, None).expect("start shell");
    let script_id = orch.shells.next_script_id(&shell.id);
    let now = orch.clock.epoch_ms();
    let script = Script::new_running(script_id.clone(), "sleep 5".into(), 0, true, now);
    orch.shells.insert_script(&shell.id, script).expect("insert");
    let live = orch.shells.open_live(script_id.clone());
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    live.set_kill_switch(tx);

    orch.end_shell(&shell.id).await.expect("end shell");
    assert!(rx.recv().await.is_some(), "kill switch fired");
    assert!(!orch.shells.exists(&shell.id));
}

#[tokio::test]
async fn task_with_serial_steps_short_circuits_on_failure() {
    let toml = r#"
preset = "permissive"

[tasks.check]
serial = ["first", "second"]

[tasks.first]
cmd = "false"

[tasks.second]
cmd = "echo"
args = ["never runs"]
"#;
    let (orch, _dir) = test_orchestrator(toml);
    let outcome = orch.task(None, "check".to_string()).await.expect("task resolves");
    match outcome {
        ExecOutcome::Foreground { success, .. } => assert!(!success),
        ExecOutcome::Background { .. } => unreachable!(),
    }
}

#[tokio::test]
async fn task_with_parallel_steps_combines_worst_status() {
    let toml = r#"
preset = "permissive"

[tasks.check]
parallel = ["ok", "bad"]

[tasks.ok]
cmd = "echo"
args = ["fine"]

[tasks.bad]
cmd = "false"
"#;
    let (orch, _dir) = test_orchestrator(toml);
    let outcome = orch.task(None, "check".to_string()).await.expect("task resolves");
    match outcome {
        ExecOutcome::Foreground { success, stdout, .. } => {
            assert!(!success);
            assert!(stdout.contains("fine"));
        }
        ExecOutcome::Background { .. } => unreachable!(),
    }
}

#[tokio::test]
async fn task_alias_chases_to_the_target_task() {
    let toml = r#"
preset = "permissive"

[tasks.alias-of-build]
alias = "build"

[tasks.build]
cmd = "echo"
args = ["building"]
"#;
    let (orch, _dir) = test_orchestrator(toml);
    let outcome = orch.task(None, "alias-of-build".to_string()).await.expect("alias resolves");
    match outcome {
        ExecOutcome::Foreground { stdout, success, .. } => {
            assert!(success);
            assert_eq!(stdout.trim(), "building");
        }
        ExecOutcome::Background { .. } => unreachable!(),
    }
}

#[tokio::test]
async fn task_cycle_is_rejected() {
    let toml = r#"
preset = "permissive"

[tasks.a]
alias = "b"

[tasks.b]
alias = "a"
"#;
    let (orch, _dir) = test_orchestrator(toml);
    let err = orch.task(None, "a".to_string()).await.expect_err("cycle detected");
    assert_eq!(err.kind, ErrorKind::ConfigInvalid);
}

#[tokio::test]
async fn task_with_unknown_name_is_not_found() {
    let (orch, _dir) = permissive();
    let err = orch.task(None, "nope".to_string()).await.expect_err("no such task");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn resolve_shell_rejects_unknown_explicit_id() {
    let (orch, _dir) = permissive();
    let err = orch
        .run(Some(ShellId::new("ghost")), "echo".to_string(), vec![], RunOpts::default())
        .await
        .expect_err("unknown shell id");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn omitted_shell_id_creates_an_ephemeral_shell() {
    let (orch, _dir) = permissive();
    let before = orch.list_shells().len();
    orch.run(None, "echo".to_string(), vec!["hi".to_string()], RunOpts::default())
        .await
        .expect("run succeeds");
    assert_eq!(orch.list_shells().len(), before + 1);
}

#[tokio::test]
async fn flush_then_reload_restores_shells_and_scripts() {
    let dir = TempDir::new().expect("tempdir");
    let state_dir = dir.path().join(".safeshell");
    std::fs::create_dir_all(&state_dir).expect("mkdir");
    std::fs::write(state_dir.join("policy.toml"), "preset = \"permissive\"\n").expect("write");

    let config = Config::for_project(dir.path());
    let clock = Arc::new(FakeClock::new(1_000));
    let orch = Orchestrator::with_clock(config.clone(), clock.clone()).expect("construct");
    let shell = orch.start_shell(None, None).expect("start shell");
    orch.run(Some(shell.id.clone()), "echo".to_string(), vec!["persisted".to_string()], RunOpts::default())
        .await
        .expect("run succeeds");
    orch.flush().expect("flush");

    let reloaded = Orchestrator::with_clock(config, clock).expect("reload");
    let shells = reloaded.list_shells();
    assert_eq!(shells.len(), 1);
    assert_eq!(shells[0].id, shell.id);
    let scripts = reloaded
        .list_scripts(&shell.id, &ListFilter::default())
        .expect("list scripts");
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].status, ScriptStatus::Completed);
    // Output content is not restored from a snapshot, only metadata.
    assert_eq!(scripts[0].stdout, "");
}

#[test]
fn first_blocked_import_detects_require_and_from() {
    let imports = safeshell_core::ImportsPolicy {
        trusted: Vec::new(),
        allowed: Vec::new(),
        blocked: vec!["child_process".to_string()],
    };
    let hit = first_blocked_import("const cp = require('child_process');", &imports);
    assert_eq!(hit.as_deref(), Some("child_process"));

    let clean = first_blocked_import("import fs from \"fs\";", &imports);
    assert!(clean.is_none());
}

#[test]
fn first_blocked_import_exempts_allowed_patterns_like_trusted() {
    let imports = safeshell_core::ImportsPolicy {
        trusted: Vec::new(),
        allowed: vec!["child_process".to_string()],
        blocked: vec!["child_process".to_string()],
    };
    let hit = first_blocked_import("const cp = require('child_process');", &imports);
    assert!(hit.is_none(), "an `allowed` pattern should exempt a `blocked` match just like `trusted`");
}

#[test]
fn join_command_formats_with_spaces() {
    assert_eq!(join_command("git", &["status".to_string(), "-s".to_string()]), "git status -s");
}
