// SPDX-License-Identifier: MIT

//! C1 Path Resolver (§4.1).
//!
//! Resolves a possibly-relative, possibly-symlinked path to its canonical
//! real form, and answers containment questions on the canonicalized forms
//! (never on raw strings — see [`contains`]).

use std::path::{Component, Path, PathBuf};

/// Context needed to expand the `${CWD}`/`${HOME}` tokens a policy's path
/// entries may contain (§6 "Paths accept the tokens `${CWD}` and `${HOME}`").
#[derive(Debug, Clone)]
pub struct PathContext {
    pub cwd: PathBuf,
    pub home: PathBuf,
}

/// Expand `${CWD}` and `${HOME}` tokens in `raw`. Any other `${...}` token is
/// left untouched (SPEC_FULL.md §C: unrecognized tokens pass through rather
/// than erroring).
pub fn expand_vars(raw: &str, ctx: &PathContext) -> String {
    raw.replace("${CWD}", &ctx.cwd.to_string_lossy())
        .replace("${HOME}", &ctx.home.to_string_lossy())
}

/// Canonicalize `path` to its real (symlink-resolved) form. If resolution
/// fails (the path doesn't exist yet), the input is returned unchanged so
/// policy can still operate on the intended form (§4.1).
pub fn real_form(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(real) => real,
        Err(_) => normalize_lexically(path),
    }
}

/// Lexically collapse `.`/`..` components without touching the filesystem,
/// used as a best-effort fallback when canonicalization fails because the
/// path doesn't exist yet.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

/// Dual-form output (§4.1 *both-forms*): `[original, real]` when they
/// differ, otherwise just `[original]`.
///
/// Essential on systems where `/tmp` is a symlink to `/private/tmp`: a grant
/// on the literal string `/tmp` must also cover `/private/tmp`, and vice
/// versa (§8 L3).
pub fn resolve_both_forms(path: &Path) -> Vec<PathBuf> {
    let real = real_form(path);
    if real == path {
        vec![path.to_path_buf()]
    } else {
        vec![path.to_path_buf(), real]
    }
}

/// True iff the real form of `candidate` equals or lies beneath the real
/// form of `ancestor`, with explicit directory-boundary checks — never a
/// naive string prefix, which would let `/foo-evil` pass for an allowed
/// `/foo` (§9 "Path containment").
pub fn contains(ancestor: &Path, candidate: &Path) -> bool {
    let ancestor_real = real_form(ancestor);
    let candidate_real = real_form(candidate);

    if candidate_real == ancestor_real {
        return true;
    }

    match candidate_real.strip_prefix(&ancestor_real) {
        Ok(rest) => !rest.as_os_str().is_empty(),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "path_resolver_tests.rs"]
mod tests;
