// SPDX-License-Identifier: MIT

//! C12 Persistence — atomic snapshot save/load (§4.12).
//!
//! Writes are atomic (temp file + rename in the same directory); a corrupt
//! load rotates the offending file to `.bak` (keeping a bounded history)
//! rather than discarding it.

use safeshell_core::{PersistedState, SNAPSHOT_VERSION};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Save `state` atomically to `path`: write to a sibling temp file, then
/// rename (§4.12 "Atomicity").
pub fn save(state: &PersistedState, path: &Path) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, state)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load the snapshot at `path` if present. Returns `Ok(None)` if the file is
/// absent or corrupt; a corrupt file is rotated to `.bak` first so the
/// service can still start from an empty snapshot (§4.12 "On load").
pub fn load(path: &Path) -> Result<Option<PersistedState>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader::<_, PersistedState>(reader) {
        Ok(state) if state.version != SNAPSHOT_VERSION => {
            let bak_path = rotate_bak_path(path);
            tracing::warn!(
                found_version = state.version,
                expected_version = SNAPSHOT_VERSION,
                path = %path.display(),
                bak = %bak_path.display(),
                "unknown snapshot version, moving to .bak and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            Ok(None)
        }
        Ok(state) => Ok(Some(state)),
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            tracing::warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "corrupt snapshot, moving to .bak and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            Ok(None)
        }
    }
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out. Keeps
/// up to [`MAX_BAK_FILES`] backups, evicting the oldest when at capacity.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
