// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! safeshell-storage: C12 Persistence (§4.12).
//!
//! Atomic snapshot save/load of Shell and Script/Job metadata, plus the
//! startup reaping pass (stale-pid detection, terminal-script pruning).
//! This crate has no knowledge of live process handles or output buffers —
//! those never leave `safeshell-manager`.

pub mod reaper;
pub mod snapshot;

pub use reaper::{prune_terminal_scripts, reap_stale_pids};
pub use snapshot::{load, save, SnapshotError};
