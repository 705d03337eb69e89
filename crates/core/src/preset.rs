// SPDX-License-Identifier: MIT

//! Built-in preset vectors (§6 "Preset semantics (must match exactly)").

use crate::constants::DEFAULT_TIMEOUT;
use crate::policy::{EnvPolicy, ImportsPolicy, NetworkGrant, Permissions, Policy, Preset};
use std::collections::HashMap;

/// Commands granted by the `permissive` preset out of the box (§6: "pre-set").
/// A conservative, commonly-needed developer toolchain — callers extend this
/// via `permissions.run` overrides the same way they would for any preset.
pub const PERMISSIVE_PRESET_COMMANDS: &[&str] = &[
    "ls", "cat", "echo", "pwd", "git", "node", "npm", "python3", "grep", "find", "curl", "wget",
];

/// Returns the documented capability vector for `preset`, with no user
/// overrides applied (§8 L1: "Preset composition is idempotent").
pub fn baseline(preset: Preset) -> Policy {
    let (read, write, net, run, imports_blocked) = match preset {
        Preset::Strict => (
            vec!["${CWD}".to_string(), "/tmp".to_string()],
            vec!["/tmp".to_string()],
            NetworkGrant::none(),
            Vec::new(),
            vec!["npm".to_string(), "http".to_string(), "https".to_string()],
        ),
        Preset::Standard => (
            vec!["${CWD}".to_string(), "/tmp".to_string()],
            vec!["${CWD}".to_string(), "/tmp".to_string()],
            NetworkGrant::none(),
            Vec::new(),
            vec!["npm".to_string(), "http".to_string(), "https".to_string()],
        ),
        Preset::Permissive => (
            vec!["${CWD}".to_string(), "/tmp".to_string(), "${HOME}".to_string()],
            vec!["${CWD}".to_string(), "/tmp".to_string()],
            NetworkGrant::all(),
            PERMISSIVE_PRESET_COMMANDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec!["http".to_string(), "https".to_string()],
        ),
    };

    Policy {
        preset,
        permissions: Permissions {
            read,
            write,
            net,
            run,
            env: Vec::new(),
        },
        external: HashMap::new(),
        env: EnvPolicy::default(),
        imports: ImportsPolicy {
            trusted: Vec::new(),
            allowed: Vec::new(),
            blocked: imports_blocked,
        },
        tasks: HashMap::new(),
        timeout: DEFAULT_TIMEOUT,
    }
}

#[cfg(test)]
#[path = "preset_tests.rs"]
mod tests;
