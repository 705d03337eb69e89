// SPDX-License-Identifier: MIT

//! `safesh exec`: submit a raw code fragment to the child runtime (§4.14).

use crate::output::{exit_code_for_error, print_error, print_exec_outcome, OutputFormat};
use anyhow::Result;
use clap::Args;
use safeshell_core::ShellId;
use safeshell_manager::{ExecOpts, Orchestrator};
use std::time::Duration;

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Code fragment to run in the child runtime.
    pub code: String,
    /// Shell to run on; a fresh ephemeral shell is created when omitted.
    #[arg(long)]
    pub shell: Option<String>,
    /// Return immediately with a pid instead of awaiting completion.
    #[arg(long)]
    pub background: bool,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

pub async fn run(orchestrator: &Orchestrator, args: ExecArgs, format: OutputFormat) -> Result<i32> {
    let opts = ExecOpts {
        background: args.background,
        timeout: args.timeout_ms.map(Duration::from_millis),
        env: None,
    };
    let shell_id = args.shell.map(ShellId::new);
    match orchestrator.exec(shell_id, args.code, opts).await {
        Ok(outcome) => Ok(print_exec_outcome(&outcome, format)),
        Err(e) => {
            let code = exit_code_for_error(&e);
            print_error(&e, format);
            Ok(code)
        }
    }
}
