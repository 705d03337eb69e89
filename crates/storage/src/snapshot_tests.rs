// SPDX-License-Identifier: MIT

use super::*;
use std::io::Write;
use tempfile::tempdir;

fn sample_state() -> PersistedState {
    PersistedState::new(PathBuf::from("/project"), 1_000)
}

#[test]
fn save_and_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    save(&sample_state(), &path).unwrap();
    assert!(path.exists());

    let loaded = load(&path).unwrap().unwrap();
    assert_eq!(loaded.project_dir, PathBuf::from("/project"));
    assert_eq!(loaded.updated_at_ms, 1_000);
}

#[test]
fn load_of_a_missing_file_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    assert!(load(&path).unwrap().is_none());
}

#[test]
fn save_leaves_no_temp_file_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    save(&sample_state(), &path).unwrap();
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn corrupt_snapshot_is_rotated_to_bak_and_load_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut f = File::create(&path).unwrap();
    f.write_all(b"not json").unwrap();
    drop(f);

    let result = load(&path).unwrap();
    assert!(result.is_none());
    assert!(!path.exists());
    assert!(path.with_extension("bak").exists());
}

#[test]
fn unknown_version_snapshot_is_rotated_to_bak_and_load_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut future_state = sample_state();
    future_state.version = SNAPSHOT_VERSION + 1;
    let file = File::create(&path).unwrap();
    serde_json::to_writer(file, &future_state).unwrap();

    let result = load(&path).unwrap();
    assert!(result.is_none());
    assert!(!path.exists());
    assert!(path.with_extension("bak").exists());
}

#[test]
fn bak_rotation_keeps_only_the_configured_number_of_backups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    for i in 1..=4u8 {
        let mut f = File::create(&path).unwrap();
        f.write_all(&[i; 4]).unwrap();
        drop(f);
        assert!(load(&path).unwrap().is_none());
    }

    assert_eq!(fs::read(path.with_extension("bak")).unwrap(), vec![4u8; 4]);
    assert_eq!(fs::read(path.with_extension("bak.2")).unwrap(), vec![3u8; 4]);
    assert_eq!(fs::read(path.with_extension("bak.3")).unwrap(), vec![2u8; 4]);
    assert!(!path.with_extension("bak.4").exists());
}
