// SPDX-License-Identifier: MIT

//! Login-shell `PATH` cache (§4.6 step 4, §9 "Ambient singletons").
//!
//! The Env Builder can fold the caller's login-shell `PATH` into a child's
//! environment so commands installed via a shell rc file (nvm, rbenv, a
//! Homebrew-managed tool) resolve the same way they would from an
//! interactive terminal. Computing it means spawning a login shell, which is
//! not free, so it is computed at most once per process lifetime and cached
//! — but as an explicit, owned component (constructed by the Orchestrator
//! and passed where it's needed), never an implicit process-global (§9).

use std::sync::OnceLock;

/// Caches the result of `$SHELL -lc 'echo $PATH'` for the life of the
/// process. Explicitly constructed and owned, not a `static`.
#[derive(Default)]
pub struct LoginShellPath {
    cached: OnceLock<Option<String>>,
}

impl LoginShellPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached login-shell `PATH`, computing it on first call.
    /// `None` if the login shell couldn't be run or printed nothing.
    pub fn get(&self) -> Option<&str> {
        self.cached.get_or_init(Self::compute).as_deref()
    }

    fn compute() -> Option<String> {
        let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
        let output = std::process::Command::new(&shell)
            .arg("-lc")
            .arg("echo $PATH")
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let raw = String::from_utf8(output.stdout).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

#[cfg(test)]
#[path = "login_path_tests.rs"]
mod tests;
