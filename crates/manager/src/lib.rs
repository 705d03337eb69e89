// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! safeshell-manager: the service's stateful core (spec §4.11-§4.14).
//!
//! Wires the Policy & Sandbox engine (`safeshell-sandbox`) and the Streaming
//! Runtime (`safeshell-runtime`) onto shared, lock-protected state: the Shell
//! Manager, the Retry Manager, and periodic persistence. The `Orchestrator`
//! is the one type downstream crates (the CLI) construct and call.

pub mod config;
pub mod login_path;
pub mod orchestrator;
pub mod retry_manager;
pub mod shell_manager;

pub use config::Config;
pub use login_path::LoginShellPath;
pub use orchestrator::{ExecOpts, ExecOutcome, Orchestrator, RunOpts, ScriptOutputView};
pub use retry_manager::RetryManager;
pub use shell_manager::{ListFilter, LiveExecution, ShellManager};
