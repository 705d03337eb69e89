// SPDX-License-Identifier: MIT

//! One module per subcommand family, mirroring the operations surface
//! (§4.14, §6): each takes the shared `Orchestrator` plus its own
//! `clap::Args` struct and prints through `crate::output`.

pub mod exec;
pub mod retry;
pub mod run;
pub mod script;
pub mod shell;
pub mod task;
