// SPDX-License-Identifier: MIT

use super::*;

fn running() -> Job {
    Job::new_running(
        JobId::new("job-1"),
        ScriptId::new("script-s1-1"),
        "git".into(),
        vec!["status".into()],
        55,
        false,
        1_000,
    )
}

#[test]
fn new_running_job_has_parent_script_id() {
    let j = running();
    assert_eq!(j.parent_script_id, ScriptId::new("script-s1-1"));
    assert_eq!(j.status, JobStatus::Running);
}

#[test]
fn complete_sets_status_from_exit_code() {
    let mut j = running();
    j.complete(0, 1_100);
    assert_eq!(j.status, JobStatus::Completed);
    let mut j2 = running();
    j2.complete(2, 1_100);
    assert_eq!(j2.status, JobStatus::Failed);
}

#[test]
fn complete_is_idempotent_once_terminal() {
    let mut j = running();
    j.complete(0, 1_100);
    j.complete(7, 1_200);
    assert_eq!(j.exit_code, Some(0));
}
