//! `task` specs (§3 *tasks*, §4.14 "task", §9 "cyclic task references").
//!
//! Task definitions are kept to the `cmd`/`args` leaf form here rather than
//! inline code, for the same reason `run_whitelist`/`script_background` stick
//! to `run`: it avoids a hard dependency on a `node` binary being on the
//! test machine's PATH (see `orchestrator_tests.rs`'s note on the tradeoff).

use crate::prelude::*;

const TASK_POLICY: &str = r#"
preset = "standard"

[permissions]
run = ["echo"]

[tasks.hello]
cmd = "echo"
args = ["hello-task"]

[tasks.first]
cmd = "echo"
args = ["first"]

[tasks.second]
cmd = "echo"
args = ["second"]

[tasks.both_serial]
serial = ["first", "second"]

[tasks.both_parallel]
parallel = ["first", "second"]

[tasks.alias_to_hello]
alias = "hello"

[tasks.cycle_a]
alias = "cycle_b"

[tasks.cycle_b]
alias = "cycle_a"
"#;

#[test]
fn leaf_task_runs_its_command() {
    let project = Project::with_policy(TASK_POLICY);

    let outcome = project.safesh().args(&["task", "hello"]).json().passes().json();
    assert!(outcome["stdout"].as_str().unwrap().contains("hello-task"));
    assert_eq!(outcome["success"].as_bool().unwrap(), true);
}

#[test]
fn serial_task_runs_subtasks_in_order_and_concatenates_output() {
    let project = Project::with_policy(TASK_POLICY);

    let outcome = project.safesh().args(&["task", "both_serial"]).json().passes().json();
    let stdout = outcome["stdout"].as_str().unwrap();
    let first_at = stdout.find("first").expect("first present");
    let second_at = stdout.find("second").expect("second present");
    assert!(first_at < second_at, "serial output must preserve task order");
}

#[test]
fn parallel_task_runs_every_subtask() {
    let project = Project::with_policy(TASK_POLICY);

    let outcome = project.safesh().args(&["task", "both_parallel"]).json().passes().json();
    let stdout = outcome["stdout"].as_str().unwrap();
    assert!(stdout.contains("first"));
    assert!(stdout.contains("second"));
    assert_eq!(outcome["success"].as_bool().unwrap(), true);
}

#[test]
fn alias_resolves_transitively_to_the_aliased_task() {
    let project = Project::with_policy(TASK_POLICY);

    let outcome = project.safesh().args(&["task", "alias_to_hello"]).json().passes().json();
    assert!(outcome["stdout"].as_str().unwrap().contains("hello-task"));
}

#[test]
fn alias_cycle_is_rejected() {
    let project = Project::with_policy(TASK_POLICY);

    let err = project.safesh().args(&["task", "cycle_a"]).json().fails().json_err();
    assert_eq!(err["error"]["kind"].as_str().unwrap(), "config-invalid");
}

#[test]
fn unknown_task_is_not_found() {
    let project = Project::with_policy(TASK_POLICY);

    let err = project.safesh().args(&["task", "does-not-exist"]).json().fails().json_err();
    assert_eq!(err["error"]["kind"].as_str().unwrap(), "not-found");
}
