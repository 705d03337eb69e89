// SPDX-License-Identifier: MIT

//! Named limits and defaults for the data model (§3, §4.10, §4.11, §4.13, §4.12).

use std::time::Duration;

/// Maximum number of live shells (§4.11 C11).
pub const MAX_SHELLS: usize = 10;

/// Maximum number of bounded pending-retry entries (§4.13 C13).
pub const MAX_PENDING_RETRIES: usize = 50;

/// TTL for a pending retry entry before it is pruned (§4.13 C13).
pub const PENDING_RETRY_TTL: Duration = Duration::from_secs(15 * 60);

/// Per-stream output buffer tail cap (§4.10 C10).
pub const OUTPUT_BUFFER_CAP_BYTES: usize = 1024 * 1024;

/// Per-shell aggregate output ceiling (§4.10 C10).
pub const SHELL_OUTPUT_CEILING_BYTES: usize = 50 * 1024 * 1024;

/// Default execution deadline when a policy does not override it (§4.9 C9).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Debounce window for coalescing persistence writes (§4.12 C12).
pub const PERSIST_DEBOUNCE: Duration = Duration::from_millis(500);

/// Number of terminal scripts retained per snapshot (§4.12 C12).
pub const SNAPSHOT_SCRIPT_HISTORY: usize = 100;

/// Length, in URL-safe base64 characters, of a materialized script's
/// content-hash filename (§4.8 C8: "16 chars, ~96 bits").
pub const SCRIPT_HASH_LEN: usize = 16;
