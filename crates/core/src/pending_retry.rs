// SPDX-License-Identifier: MIT

//! PendingRetry: blocked-operation capsule (§3 *PendingRetry*, §4.13 C13).

use crate::shell::ShellId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

crate::define_id! {
    /// Locally-unique id for a pending, blocked operation awaiting approval.
    pub struct RetryId;
}

/// Exactly one of the three capability-failure shapes a pending retry can
/// record (§3: "one of: {blockedCommand} | {blockedCommands,
/// notFoundCommands} | {blockedHost}").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockedReason {
    Command { blocked_command: String },
    Commands {
        blocked_commands: Vec<String>,
        not_found_commands: Vec<String>,
    },
    Host { blocked_host: String },
    /// A module specifier matched `imports.blocked` (§7 *import-blocked*).
    /// Not named in §3's enumeration of the three PendingRetry shapes, added
    /// here so `ImportBlocked` — already marked retryable in
    /// [`crate::ErrorKind::is_retryable`] — has somewhere to put its detail.
    Import { blocked_import: String },
}

/// A capsule recording a blocked operation so a caller can reissue it after
/// approval (GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingRetry {
    pub id: RetryId,
    /// The fragment that was blocked.
    pub code: String,
    /// Content-addressed reference to a materialized script, if one existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_hash: Option<String>,
    pub shell_id: ShellId,
    /// Arbitrary caller-supplied restart info, echoed back unchanged on retry.
    #[serde(default)]
    pub context: HashMap<String, String>,
    pub reason: BlockedReason,
    pub created_at_ms: u64,
}

impl PendingRetry {
    pub fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) > ttl_ms
    }
}

#[cfg(test)]
#[path = "pending_retry_tests.rs"]
mod tests;
