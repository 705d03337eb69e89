// SPDX-License-Identifier: MIT

//! C5 Sandbox Checker (§4.5).
//!
//! The last gate before a path reaches the child runtime: expand variables,
//! compute the real form, test containment against every allowed root (in
//! both its literal and real forms), and reject unconditionally on a
//! deny-list hit — a deny match always wins regardless of any allow match.

use crate::path_resolver::{contains, expand_vars, real_form, PathContext};
use safeshell_core::{ErrorKind, SafeShellError};
use std::path::{Path, PathBuf};

/// Whether a path argument is being checked for reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    Read,
    Write,
}

/// Fixed, non-configurable set of security-sensitive paths checked in
/// addition to whatever the policy grants (§C "Deny-lists (C5)"). Expressed
/// as fragments relative to `${HOME}`; matched against the real form of the
/// path under check with the same `contains` test used for allow roots, so
/// `~/.ssh/known_hosts` is blocked by the `~/.ssh` entry without listing
/// every file inside it.
const HOME_RELATIVE_DENY_FRAGMENTS: &[&str] = &[
    ".ssh",
    ".aws",
    ".gnupg",
    ".kube",
    ".docker",
    ".bashrc",
    ".zshrc",
    ".bash_profile",
    ".profile",
    ".npmrc",
    ".cargo/credentials",
    ".cargo/credentials.toml",
    ".config/gh/hosts.yml",
];

/// Fragments that are denied wherever they occur beneath a read/write root,
/// not only under `${HOME}` (e.g. a project-local `.git/hooks`).
const RELATIVE_DENY_FRAGMENTS: &[&str] = &[".git/hooks"];

fn deny_roots(ctx: &PathContext) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = HOME_RELATIVE_DENY_FRAGMENTS
        .iter()
        .map(|frag| ctx.home.join(frag))
        .collect();
    roots.extend(RELATIVE_DENY_FRAGMENTS.iter().map(|frag| ctx.cwd.join(frag)));
    roots
}

/// Validate `raw_path` for `mode` access against `allowed_roots` (dual-form,
/// as produced by [`crate::path_resolver::resolve_both_forms`]). Returns the
/// real form of the path on success.
pub fn validate_path(
    raw_path: &str,
    mode: PathMode,
    allowed_roots: &[PathBuf],
    ctx: &PathContext,
) -> Result<PathBuf, SafeShellError> {
    let expanded = expand_vars(raw_path, ctx);
    let candidate = real_form(Path::new(&expanded));

    for deny_root in deny_roots(ctx) {
        if contains(&deny_root, &candidate) {
            return Err(SafeShellError::new(
                ErrorKind::PathBlocked,
                format!("{} is within a denied path ({:?})", expanded, mode),
            ));
        }
    }

    if allowed_roots
        .iter()
        .any(|root| contains(root, &candidate))
    {
        return Ok(candidate);
    }

    Err(SafeShellError::new(
        ErrorKind::PathBlocked,
        format!("{expanded} is outside the sandbox for {mode:?} access"),
    ))
}

#[cfg(test)]
#[path = "sandbox_checker_tests.rs"]
mod tests;
