//! `script` inspection specs (§4.9 C9, §4.10 C10, §6 `listScripts`/
//! `getScriptOutput`/`waitScript`/`killScript`).
//!
//! `run` always awaits completion (only `exec` accepts `background`, and
//! `exec`'s `node`-backed path needs a `node` binary on PATH — see
//! `orchestrator_tests.rs`'s note on the same tradeoff), so by the time a
//! second `safesh` invocation can inspect a script it has already reached a
//! terminal state. These specs cover what the CLI facade can actually
//! exercise across process boundaries: listing, reading output, waiting on
//! (and killing) an already-terminal script.

use crate::prelude::*;

#[test]
fn completed_script_is_listed_and_its_output_is_readable() {
    let project = Project::with_policy(PERMISSIVE_POLICY);

    let shell = project.safesh().args(&["shell", "start"]).json().passes().json();
    let shell_id = shell["id"].as_str().unwrap().to_string();

    let outcome = project
        .safesh()
        .args(&["run", "--shell", &shell_id, "echo", "script-output-check"])
        .json()
        .passes()
        .json();
    let script_id = outcome["scriptId"].as_str().unwrap().to_string();

    let scripts = project
        .safesh()
        .args(&["script", "list", &shell_id])
        .json()
        .passes()
        .json();
    let listed = scripts.as_array().unwrap();
    assert!(listed.iter().any(|s| s["id"].as_str().unwrap() == script_id));
    let entry = listed.iter().find(|s| s["id"].as_str().unwrap() == script_id).unwrap();
    assert_eq!(entry["status"].as_str().unwrap(), "completed");

    let output = project
        .safesh()
        .args(&["script", "output", &shell_id, &script_id])
        .json()
        .passes()
        .json();
    assert!(output["stdout"].as_str().unwrap().contains("script-output-check"));
    assert_eq!(output["exitCode"].as_i64().unwrap(), 0);
}

#[test]
fn wait_on_an_already_terminal_script_returns_immediately() {
    let project = Project::with_policy(PERMISSIVE_POLICY);

    let outcome = project.safesh().args(&["run", "echo", "done"]).json().passes().json();
    let script_id = outcome["scriptId"].as_str().unwrap().to_string();

    // Find the shell this ephemeral run landed on.
    let shells = project.safesh().args(&["shell", "list"]).json().passes().json();
    let shell_id = shells.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();

    project
        .safesh()
        .args(&["script", "wait", &shell_id, &script_id])
        .passes();
}

#[test]
fn killing_a_terminal_script_is_a_harmless_no_op() {
    let project = Project::with_policy(PERMISSIVE_POLICY);

    let outcome = project.safesh().args(&["run", "echo", "done"]).json().passes().json();
    let script_id = outcome["scriptId"].as_str().unwrap().to_string();
    let shells = project.safesh().args(&["shell", "list"]).json().passes().json();
    let shell_id = shells.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();

    project
        .safesh()
        .args(&["script", "kill", &shell_id, &script_id])
        .passes();
}

#[test]
fn list_filters_by_status() {
    let project = Project::with_policy(PERMISSIVE_POLICY);
    let shell = project.safesh().args(&["shell", "start"]).json().passes().json();
    let shell_id = shell["id"].as_str().unwrap().to_string();

    project
        .safesh()
        .args(&["run", "--shell", &shell_id, "echo", "one"])
        .passes();
    project
        .safesh()
        .args(&["run", "--shell", &shell_id, "echo", "two"])
        .passes();

    let scripts = project
        .safesh()
        .args(&["script", "list", &shell_id, "--status", "completed"])
        .json()
        .passes()
        .json();
    let listed = scripts.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|s| s["status"].as_str().unwrap() == "completed"));
}
