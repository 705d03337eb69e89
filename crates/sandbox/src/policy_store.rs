// SPDX-License-Identifier: MIT

//! C3 Policy Store (§4.3).
//!
//! Construction: load a preset, deep-merge user overrides (capability arrays
//! unioned, scalars replaced), then compute a **resolved view** once and
//! carry it alongside — never re-derive it per request (§9 "Capability view
//! vs. stored policy").

use crate::path_resolver::{expand_vars, resolve_both_forms, PathContext};
use safeshell_core::{
    EnvPolicy, ErrorKind, ImportsPolicy, NetworkGrant, Permissions, Policy, PolicyConfig,
    SafeShellError, TaskDef,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A non-fatal observation recorded during validation (§4.3: "validation
/// diagnostics are carried alongside the resolved view; fatal errors prevent
/// use").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub message: String,
}

/// The resolved capability view (§4.3), computed once at load time.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    pub policy: Policy,
    pub all_allowed_commands: HashSet<String>,
    /// Dual-form (literal + real) read roots.
    pub read_roots: Vec<PathBuf>,
    /// Dual-form (literal + real) write roots.
    pub write_roots: Vec<PathBuf>,
    pub net: NetworkGrant,
    pub env: EnvPolicy,
    pub tasks: HashMap<String, TaskDef>,
    pub timeout: Duration,
}

/// Immutable snapshot: the merged [`Policy`] plus its [`ResolvedPolicy`] view
/// and any non-fatal diagnostics collected during validation.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    pub resolved: ResolvedPolicy,
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl PolicyStore {
    /// Load a policy: preset baseline, deep-merged with `overrides`, resolved
    /// and validated. Fatal validation failures return `Err`; non-fatal ones
    /// are attached to the returned store.
    pub fn load(overrides: PolicyConfig, ctx: &PathContext) -> Result<Self, SafeShellError> {
        let preset = overrides.preset.unwrap_or_default();
        let baseline = safeshell_core::baseline(preset);
        let merged = merge(baseline, overrides);

        let mut diagnostics = Vec::new();
        validate(&merged, &mut diagnostics)?;

        let all_allowed_commands: HashSet<String> = merged
            .permissions
            .run
            .iter()
            .cloned()
            .chain(merged.external.keys().cloned())
            .collect();

        let read_roots = resolve_roots(&merged.permissions.read, ctx);
        let write_roots = resolve_roots(&merged.permissions.write, ctx);

        let resolved = ResolvedPolicy {
            net: merged.permissions.net.clone(),
            env: merged.env.clone(),
            tasks: merged.tasks.clone(),
            timeout: merged.timeout,
            all_allowed_commands,
            read_roots,
            write_roots,
            policy: merged,
        };

        Ok(Self {
            resolved,
            diagnostics,
        })
    }
}

fn resolve_roots(raw: &[String], ctx: &PathContext) -> Vec<PathBuf> {
    raw.iter()
        .flat_map(|entry| {
            let expanded = expand_vars(entry, ctx);
            resolve_both_forms(Path::new(&expanded))
        })
        .collect()
}

fn union_strings(a: Vec<String>, b: Vec<String>) -> Vec<String> {
    let mut out = a;
    for item in b {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn merge(mut base: Policy, overrides: PolicyConfig) -> Policy {
    base.permissions = merge_permissions(base.permissions, overrides.permissions);

    for (name, rule) in overrides.external {
        base.external.insert(name, rule);
    }

    base.env = EnvPolicy {
        allow: union_strings(base.env.allow, overrides.env.allow),
        mask: union_strings(base.env.mask, overrides.env.mask),
    };

    base.imports = ImportsPolicy {
        trusted: union_strings(base.imports.trusted, overrides.imports.trusted),
        allowed: union_strings(base.imports.allowed, overrides.imports.allowed),
        blocked: union_strings(base.imports.blocked, overrides.imports.blocked),
    };

    for (name, task) in overrides.tasks {
        base.tasks.insert(name, task);
    }

    if let Some(ms) = overrides.timeout_ms {
        base.timeout = Duration::from_millis(ms);
    }

    base
}

fn merge_permissions(base: Permissions, overrides: Permissions) -> Permissions {
    Permissions {
        read: union_strings(base.read, overrides.read),
        write: union_strings(base.write, overrides.write),
        net: base.net.union(&overrides.net),
        run: union_strings(base.run, overrides.run),
        env: union_strings(base.env, overrides.env),
    }
}

/// One-time validation (§4.3): fatal errors prevent use; warnings are
/// attached to the store.
fn validate(policy: &Policy, diagnostics: &mut Vec<ValidationDiagnostic>) -> Result<(), SafeShellError> {
    for write_path in &policy.permissions.write {
        if is_filesystem_root(write_path) {
            return Err(SafeShellError::new(
                ErrorKind::ConfigInvalid,
                format!("write path '{write_path}' is the filesystem root or an ancestor of it"),
            ));
        }
    }

    for trusted in &policy.imports.trusted {
        if policy.imports.blocked.contains(trusted) {
            diagnostics.push(ValidationDiagnostic {
                message: format!("import '{trusted}' is both trusted and blocked"),
            });
        }
    }

    Ok(())
}

fn is_filesystem_root(raw: &str) -> bool {
    let trimmed = raw.trim_end_matches('/');
    trimmed.is_empty() || trimmed == "."
}

#[cfg(test)]
#[path = "policy_store_tests.rs"]
mod tests;
