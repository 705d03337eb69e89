// SPDX-License-Identifier: MIT

//! `safesh run`: submit a whitelisted command invocation (§4.14).

use crate::output::{exit_code_for_error, print_error, print_exec_outcome, OutputFormat};
use anyhow::Result;
use clap::Args;
use safeshell_core::ShellId;
use safeshell_manager::{Orchestrator, RunOpts};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Shell to run on; a fresh ephemeral shell is created when omitted.
    #[arg(long)]
    pub shell: Option<String>,
    #[arg(long)]
    pub cwd: Option<PathBuf>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// Command to run.
    pub cmd: String,
    /// Arguments to the command.
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

pub async fn run(orchestrator: &Orchestrator, args: RunArgs, format: OutputFormat) -> Result<i32> {
    let opts = RunOpts { cwd: args.cwd, timeout: args.timeout_ms.map(Duration::from_millis) };
    let shell_id = args.shell.map(ShellId::new);
    match orchestrator.run(shell_id, args.cmd, args.args, opts).await {
        Ok(outcome) => Ok(print_exec_outcome(&outcome, format)),
        Err(e) => {
            let code = exit_code_for_error(&e);
            print_error(&e, format);
            Ok(code)
        }
    }
}
