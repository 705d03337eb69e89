// SPDX-License-Identifier: MIT

//! C8 Script Materializer (§4.8).
//!
//! Content-addresses `preamble ⊕ user_code ⊕ epilogue` and writes it once
//! under a per-service scripts directory. Writes are idempotent: a second
//! materialization of byte-identical content reuses the existing file
//! rather than re-writing it (L4).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use safeshell_core::{ErrorKind, SafeShellError, SCRIPT_HASH_LEN};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Content-address `preamble ⊕ user_code ⊕ epilogue` (§4.8).
pub fn content_hash(preamble: &str, user_code: &str, epilogue: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(preamble.as_bytes());
    hasher.update(user_code.as_bytes());
    hasher.update(epilogue.as_bytes());
    let digest = hasher.finalize();
    URL_SAFE_NO_PAD.encode(digest)[..SCRIPT_HASH_LEN].to_string()
}

/// Write `content` under `scripts_dir`, named by its content hash, and
/// return the resulting path. A file that already exists with that name is
/// reused unmodified (idempotent write).
pub fn materialize(
    scripts_dir: &Path,
    preamble: &str,
    user_code: &str,
    epilogue: &str,
) -> Result<PathBuf, SafeShellError> {
    let hash = content_hash(preamble, user_code, epilogue);
    let path = scripts_dir.join(format!("{hash}.script"));

    if path.exists() {
        return Ok(path);
    }

    std::fs::create_dir_all(scripts_dir).map_err(|e| {
        SafeShellError::internal(format!("creating scripts dir {scripts_dir:?}: {e}"))
    })?;

    let content = format!("{preamble}{user_code}{epilogue}");
    let tmp_path = scripts_dir.join(format!("{hash}.script.tmp-{}", std::process::id()));
    std::fs::write(&tmp_path, content)
        .map_err(|e| SafeShellError::new(ErrorKind::Internal, format!("writing script: {e}")))?;

    match std::fs::rename(&tmp_path, &path) {
        Ok(()) => Ok(path),
        Err(e) if path.exists() => {
            let _ = std::fs::remove_file(&tmp_path);
            let _ = e;
            Ok(path)
        }
        Err(e) => Err(SafeShellError::new(
            ErrorKind::Internal,
            format!("renaming materialized script: {e}"),
        )),
    }
}

#[cfg(test)]
#[path = "materializer_tests.rs"]
mod tests;
