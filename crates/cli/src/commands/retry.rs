// SPDX-License-Identifier: MIT

//! `safesh retry`: re-issue a previously blocked operation (§4.13).

use crate::output::{exit_code_for_error, print_error, print_exec_outcome, OutputFormat};
use anyhow::Result;
use clap::Args;
use safeshell_core::RetryId;
use safeshell_manager::Orchestrator;

#[derive(Debug, Args)]
pub struct RetryArgs {
    /// Id returned on a blocked operation's error (`retry.retryId`).
    pub retry_id: String,
}

pub async fn run(orchestrator: &Orchestrator, args: RetryArgs, format: OutputFormat) -> Result<i32> {
    let retry_id = RetryId::new(args.retry_id);
    match orchestrator.retry(&retry_id).await {
        Ok(outcome) => Ok(print_exec_outcome(&outcome, format)),
        Err(e) => {
            let code = exit_code_for_error(&e);
            print_error(&e, format);
            Ok(code)
        }
    }
}
