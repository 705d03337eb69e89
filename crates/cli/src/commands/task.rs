// SPDX-License-Identifier: MIT

//! `safesh task`: run a named task from policy config (§4.14).

use crate::output::{exit_code_for_error, print_error, print_exec_outcome, OutputFormat};
use anyhow::Result;
use clap::Args;
use safeshell_core::ShellId;
use safeshell_manager::Orchestrator;

#[derive(Debug, Args)]
pub struct TaskArgs {
    /// Task name, as declared in policy config.
    pub name: String,
    #[arg(long)]
    pub shell: Option<String>,
}

pub async fn run(orchestrator: &Orchestrator, args: TaskArgs, format: OutputFormat) -> Result<i32> {
    let shell_id = args.shell.map(ShellId::new);
    match orchestrator.task(shell_id, args.name).await {
        Ok(outcome) => Ok(print_exec_outcome(&outcome, format)),
        Err(e) => {
            let code = exit_code_for_error(&e);
            print_error(&e, format);
            Ok(code)
        }
    }
}
