//! `run` command validation specs (§4.4 C4, §4.13 C13, §8 scenarios 2-3).

use crate::prelude::*;

#[test]
fn whitelisted_command_runs_and_returns_its_output() {
    let project = Project::with_policy(PERMISSIVE_POLICY);

    let outcome = project
        .safesh()
        .args(&["run", "echo", "hello-safeshell"])
        .json()
        .passes()
        .json();

    assert_eq!(outcome["exitCode"].as_i64().unwrap(), 0);
    assert_eq!(outcome["success"].as_bool().unwrap(), true);
    assert!(outcome["stdout"].as_str().unwrap().contains("hello-safeshell"));
}

#[test]
fn standard_preset_blocks_an_unlisted_command_and_mints_a_retry() {
    // Scenario 2 (§8): standard preset grants no run commands.
    let project = Project::empty();

    let err = project
        .safesh()
        .args(&["run", "git", "status"])
        .json()
        .fails()
        .json_err();

    assert_eq!(err["error"]["kind"].as_str().unwrap(), "command-blocked");
    let retry_id = err["error"]["retryId"].as_str().expect("retry id present").to_string();
    assert!(!retry_id.is_empty());
}

#[test]
fn preapproved_command_runs_without_a_retry() {
    // A policy that already grants `git` via permissions.run never produces
    // a PendingRetry for it (§4.4 step 1).
    let project = Project::with_policy(
        r#"
preset = "standard"

[permissions]
run = ["git"]
"#,
    );
    project.git_init();

    let outcome = project.safesh().args(&["run", "git", "status"]).json().passes().json();
    assert_eq!(outcome["success"].as_bool().unwrap(), true);
}

#[test]
fn retry_consumed_twice_is_not_found() {
    let project = Project::empty();
    project.git_init();

    let err = project
        .safesh()
        .args(&["run", "git", "status"])
        .json()
        .fails()
        .json_err();
    let retry_id = err["error"]["retryId"].as_str().unwrap().to_string();

    // First retry: git still isn't approved by the standard preset itself,
    // but the retry call inserts it into this process's session-allowed set
    // before re-issuing, so it now succeeds (§C "session allowed commands").
    project.safesh().args(&["retry", &retry_id]).passes();

    // The retry id itself is single-use (§4.13 `consume`): reusing it must
    // report not-found, not re-run the command a second time.
    let err = project.safesh().args(&["retry", &retry_id]).json().fails().json_err();
    assert_eq!(err["error"]["kind"].as_str().unwrap(), "not-found");
}

#[test]
fn flag_deny_blocks_a_dangerous_flag() {
    // Scenario 3 (§8): external.git={allow:true, denyFlags:["--force"]}.
    let project = Project::with_policy(
        r#"
preset = "standard"

[permissions]
run = ["git"]

[external.git]
allow = true
deny_flags = ["--force"]
"#,
    );
    project.git_init();

    let err = project
        .safesh()
        .args(&["run", "git", "push", "--force"])
        .json()
        .fails()
        .json_err();

    assert_eq!(err["error"]["kind"].as_str().unwrap(), "flag-denied");
}

#[test]
fn subcommand_allow_list_blocks_other_subcommands() {
    let project = Project::with_policy(
        r#"
preset = "standard"

[permissions]
run = ["git"]

[external.git]
allow = ["status", "log"]
"#,
    );
    project.git_init();

    project
        .safesh()
        .args(&["run", "git", "status"])
        .json()
        .passes();

    let err = project
        .safesh()
        .args(&["run", "git", "push"])
        .json()
        .fails()
        .json_err();
    assert_eq!(err["error"]["kind"].as_str().unwrap(), "subcommand-blocked");
}
