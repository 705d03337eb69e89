// SPDX-License-Identifier: MIT

//! C6 Env Builder (§4.6).
//!
//! Builds the environment map a child process sees: allow-filter the
//! process environment, overlay the shell's own env (mask still applies),
//! inject context keys, and optionally fold in the login-shell `PATH`.

use crate::pattern::matches_any;
use safeshell_core::EnvPolicy;
use std::collections::HashMap;

/// Context injected into every child regardless of policy (§6 "Process
/// environment injected into children").
pub struct EnvContext<'a> {
    pub shell_id: &'a str,
    pub script_id: Option<&'a str>,
    /// Login-shell `PATH`, captured once per process lifetime, folded in
    /// ahead of the caller's own `PATH` entries so caller entries win on
    /// duplicate directories (§4.6 step 4).
    pub login_shell_path: Option<&'a str>,
}

/// Build the environment for a child process (§4.6).
///
/// `process_env` stands in for the current process's environment so this
/// function stays pure and testable; callers pass `std::env::vars()`
/// collected into a map.
pub fn build_child_env(
    process_env: &HashMap<String, String>,
    shell_env: &HashMap<String, String>,
    policy: &EnvPolicy,
    ctx: &EnvContext<'_>,
) -> HashMap<String, String> {
    let mut out = HashMap::new();

    let allow: Vec<&str> = policy.allow.iter().map(String::as_str).collect();
    for (key, value) in process_env {
        if matches_any(allow.iter().copied(), key) && !is_masked(key, policy) {
            out.insert(key.clone(), value.clone());
        }
    }

    for (key, value) in shell_env {
        if is_masked(key, policy) {
            out.remove(key);
        } else {
            out.insert(key.clone(), value.clone());
        }
    }

    if let Some(login_path) = ctx.login_shell_path {
        let caller_path = out.get("PATH").cloned().unwrap_or_default();
        out.insert("PATH".to_string(), fold_path(&caller_path, login_path));
    }

    out.insert("SAFESH_SHELL_ID".to_string(), ctx.shell_id.to_string());
    if let Some(script_id) = ctx.script_id {
        out.insert("SAFESH_SCRIPT_ID".to_string(), script_id.to_string());
    }

    out
}

fn is_masked(key: &str, policy: &EnvPolicy) -> bool {
    let mask: Vec<&str> = policy.mask.iter().map(String::as_str).collect();
    matches_any(mask.iter().copied(), key)
}

/// Merge `caller_path` and `login_path` into one `PATH` value, deduplicated,
/// caller entries first (§4.6 step 4: "caller-PATH entries first to
/// preserve priority").
fn fold_path(caller_path: &str, login_path: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut entries = Vec::new();
    for entry in caller_path.split(':').chain(login_path.split(':')) {
        if !entry.is_empty() && seen.insert(entry) {
            entries.push(entry);
        }
    }
    entries.join(":")
}

#[cfg(test)]
#[path = "env_builder_tests.rs"]
mod tests;
