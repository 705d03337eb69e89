//! Shell lifecycle specs (§4.11, §6 `startShell`/`updateShell`/`endShell`/`listShells`).

use crate::prelude::*;

#[test]
fn start_creates_a_shell_scoped_to_the_project_dir() {
    let project = Project::empty();

    let shell = project.safesh().args(&["shell", "start"]).json().passes().json();

    assert!(shell["id"].as_str().unwrap().starts_with("shell-") || !shell["id"].as_str().unwrap().is_empty());
    assert_eq!(shell["cwd"].as_str().unwrap(), project.path().to_string_lossy());
    assert_eq!(shell["scripts"].as_object().unwrap().len(), 0);
}

#[test]
fn list_shells_reflects_creation_and_end() {
    let project = Project::empty();

    let shell = project.safesh().args(&["shell", "start"]).json().passes().json();
    let shell_id = shell["id"].as_str().unwrap().to_string();

    let listed = project.safesh().args(&["shell", "list"]).json().passes().json();
    let ids: Vec<&str> = listed.as_array().unwrap().iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&shell_id.as_str()));

    project.safesh().args(&["shell", "end", &shell_id]).passes();

    let listed = project.safesh().args(&["shell", "list"]).json().passes().json();
    let ids: Vec<&str> = listed.as_array().unwrap().iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert!(!ids.contains(&shell_id.as_str()));
}

#[test]
fn update_shell_changes_cwd() {
    let project = Project::empty();
    let subdir = project.path().join("sub");
    std::fs::create_dir_all(&subdir).unwrap();

    let shell = project.safesh().args(&["shell", "start"]).json().passes().json();
    let shell_id = shell["id"].as_str().unwrap().to_string();

    project
        .safesh()
        .args(&["shell", "update", &shell_id, "--cwd"])
        .args(&[subdir.to_str().unwrap()])
        .passes();

    let listed = project.safesh().args(&["shell", "list"]).json().passes().json();
    let updated = listed
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"].as_str().unwrap() == shell_id)
        .unwrap();
    assert_eq!(updated["cwd"].as_str().unwrap(), subdir.to_string_lossy());
}

#[test]
fn operating_on_an_unknown_shell_is_not_found() {
    let project = Project::empty();

    project
        .safesh()
        .args(&["shell", "end", "shell-does-not-exist"])
        .json()
        .fails()
        .json_err();
}

#[test]
fn shell_cap_evicts_the_oldest_idle_shell() {
    // MAX_SHELLS is 10 (§4.11); creating an eleventh must evict the oldest
    // idle shell rather than fail, since none of them have running scripts.
    let project = Project::empty();
    let mut first_id = None;

    for i in 0..11 {
        let shell = project.safesh().args(&["shell", "start"]).json().passes().json();
        if i == 0 {
            first_id = Some(shell["id"].as_str().unwrap().to_string());
        }
    }

    let listed = project.safesh().args(&["shell", "list"]).json().passes().json();
    let shells = listed.as_array().unwrap();
    assert_eq!(shells.len(), 10, "shell count must stay at MAX_SHELLS (I2)");

    let ids: Vec<&str> = shells.iter().map(|s| s["id"].as_str().unwrap()).collect();
    assert!(
        !ids.contains(&first_id.unwrap().as_str()),
        "the oldest shell should have been evicted to make room"
    );
}
