// SPDX-License-Identifier: MIT

//! Policy document shape (§3, §6).
//!
//! This module only defines the shape of a policy and the three built-in
//! presets. Merging a user [`PolicyConfig`] onto a preset, validating the
//! result, and computing the resolved capability view are the Policy Store's
//! job (C3, `safeshell-sandbox::policy_store`) — kept out of this crate so
//! that the data model stays free of merge semantics.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// One of the three built-in presets (§6 preset semantics table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Strict,
    Standard,
    Permissive,
}

impl Default for Preset {
    fn default() -> Self {
        Preset::Standard
    }
}

/// Network grant: nothing, an explicit host allow-list, or everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkGrant {
    List(Vec<String>),
    All(AllMarker),
}

/// Serializes/deserializes as the literal string `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllMarker;

impl Serialize for AllMarker {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str("all")
    }
}

impl<'de> Deserialize<'de> for AllMarker {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        if s == "all" {
            Ok(AllMarker)
        } else {
            Err(serde::de::Error::custom("expected the literal string \"all\""))
        }
    }
}

impl NetworkGrant {
    pub fn none() -> Self {
        NetworkGrant::List(Vec::new())
    }

    pub fn all() -> Self {
        NetworkGrant::All(AllMarker)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, NetworkGrant::All(_))
    }

    /// Union two grants: "all" dominates; otherwise the host lists are merged.
    pub fn union(&self, other: &NetworkGrant) -> NetworkGrant {
        match (self, other) {
            (NetworkGrant::All(_), _) | (_, NetworkGrant::All(_)) => NetworkGrant::all(),
            (NetworkGrant::List(a), NetworkGrant::List(b)) => {
                let mut merged = a.clone();
                for host in b {
                    if !merged.contains(host) {
                        merged.push(host.clone());
                    }
                }
                NetworkGrant::List(merged)
            }
        }
    }
}

/// Capability allow-lists (§3 *permissions*).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
    #[serde(default = "NetworkGrant::none")]
    pub net: NetworkGrant,
    #[serde(default)]
    pub run: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
}

impl Default for NetworkGrant {
    fn default() -> Self {
        NetworkGrant::none()
    }
}

/// How a command's first positional argument (the subcommand) is gated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubcommandAllow {
    /// `allow: true` — every subcommand accepted.
    All(bool),
    /// `allow: ["status", "log"]` — only these subcommands accepted.
    List(Vec<String>),
}

/// Which argument positions carry filesystem paths, and how to validate them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathArgsConfig {
    #[serde(default)]
    pub auto_detect: bool,
    #[serde(default)]
    pub validate_sandbox: bool,
    #[serde(default)]
    pub positions: Option<Vec<usize>>,
}

/// Per-command rule set (§3 *external*).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRule {
    #[serde(default = "default_allow_all")]
    pub allow: SubcommandAllow,
    #[serde(default)]
    pub deny_flags: Vec<String>,
    #[serde(default)]
    pub require_flags: Vec<String>,
    #[serde(default)]
    pub path_args: Option<PathArgsConfig>,
}

fn default_allow_all() -> SubcommandAllow {
    SubcommandAllow::All(true)
}

impl Default for ExternalRule {
    fn default() -> Self {
        Self {
            allow: default_allow_all(),
            deny_flags: Vec::new(),
            require_flags: Vec::new(),
            path_args: None,
        }
    }
}

/// Environment allow/mask pattern lists (§3 *env*).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvPolicy {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub mask: Vec<String>,
}

/// Import specifier policy (§3 *imports*).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportsPolicy {
    #[serde(default)]
    pub trusted: Vec<String>,
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub blocked: Vec<String>,
}

/// A task definition (§3 *tasks*, §6 `tasks[name]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskDef {
    /// `tasks.build = "npm run build"` shorthand: inline code, no overrides.
    Inline(String),
    /// Full form with optional cwd/env and one of inline/parallel/serial/alias.
    Full(TaskSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub parallel: Vec<String>,
    #[serde(default)]
    pub serial: Vec<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// User-authored configuration document (§6 "Configuration schema").
///
/// Every field is optional; absence means "inherit from the preset". Array
/// fields are unioned with the preset's during merge (C3), not replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub preset: Option<Preset>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub external: HashMap<String, ExternalRule>,
    #[serde(default)]
    pub env: EnvPolicy,
    #[serde(default)]
    pub imports: ImportsPolicy,
    #[serde(default)]
    pub tasks: HashMap<String, TaskDef>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// A merged, preset-plus-overrides policy document (§3 *Policy*).
///
/// This is the output of C3's merge step, still in "raw" form (paths not yet
/// canonicalized, no resolved capability view). `safeshell-sandbox::PolicyStore`
/// wraps this with the resolved view and validation diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub preset: Preset,
    pub permissions: Permissions,
    pub external: HashMap<String, ExternalRule>,
    pub env: EnvPolicy,
    pub imports: ImportsPolicy,
    pub tasks: HashMap<String, TaskDef>,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
