// SPDX-License-Identifier: MIT

//! Service configuration: where a project's policy file and persisted state
//! live (SPEC_FULL.md §B "Configuration").
//!
//! `Config::load` resolves a project-local path
//! (`<project_dir>/.safeshell/policy.toml`), falling back to an in-memory
//! default (the `standard` preset) when the file is absent — the same
//! "load or default" shape this workspace's daemon config loader uses for
//! its own config file.

use safeshell_core::{ErrorKind, PolicyConfig, SafeShellError};
use std::path::{Path, PathBuf};

/// Paths derived from a project root. Every persisted artifact — the policy
/// file, the state snapshot, materialized scripts — lives under
/// `<project_dir>/.safeshell/` (SPEC_FULL.md §C "Snapshot path").
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub policy_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub scripts_dir: PathBuf,
}

impl Config {
    pub fn for_project(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let state_dir = project_dir.join(".safeshell");
        Self {
            policy_path: state_dir.join("policy.toml"),
            snapshot_path: state_dir.join("state.json"),
            scripts_dir: state_dir.join("scripts"),
            project_dir,
        }
    }

    /// Load the policy config document at [`Self::policy_path`], or the
    /// empty (preset-only) document if the file doesn't exist.
    pub fn load_policy(&self) -> Result<PolicyConfig, SafeShellError> {
        load_policy_from(&self.policy_path)
    }
}

fn load_policy_from(path: &Path) -> Result<PolicyConfig, SafeShellError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).map_err(|e| {
            SafeShellError::new(
                ErrorKind::ConfigInvalid,
                format!("parsing policy file {}: {e}", path.display()),
            )
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PolicyConfig::default()),
        Err(e) => Err(SafeShellError::new(
            ErrorKind::ConfigInvalid,
            format!("reading policy file {}: {e}", path.display()),
        )),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
