// SPDX-License-Identifier: MIT

//! `safesh script`: inspect, await, and kill scripts on a shell (§4.9, §4.10).

use crate::output::{exit_code_for_error, print_error, print_script, OutputFormat};
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use safeshell_core::{ScriptId, ScriptStatus, ShellId};
use safeshell_manager::{ListFilter, Orchestrator};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Args)]
pub struct ScriptArgs {
    #[command(subcommand)]
    pub command: ScriptCommand,
}

#[derive(Debug, Subcommand)]
pub enum ScriptCommand {
    /// List scripts recorded on a shell.
    List {
        shell: String,
        #[arg(long, value_parser = parse_status)]
        status: Option<ScriptStatus>,
        #[arg(long)]
        background: Option<bool>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Read a script's accumulated stdout/stderr.
    Output {
        shell: String,
        script: String,
        /// Only return output appended after this byte offset.
        #[arg(long)]
        since: Option<u64>,
    },
    /// Block until a script reaches a terminal state.
    Wait {
        shell: String,
        script: String,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Terminate a running script.
    Kill { shell: String, script: String },
}

fn parse_status(raw: &str) -> Result<ScriptStatus, String> {
    match raw {
        "running" => Ok(ScriptStatus::Running),
        "completed" => Ok(ScriptStatus::Completed),
        "failed" => Ok(ScriptStatus::Failed),
        other => Err(format!("unknown status '{other}' (expected running|completed|failed)")),
    }
}

pub async fn run(orchestrator: &Orchestrator, args: ScriptArgs, format: OutputFormat) -> Result<i32> {
    match args.command {
        ScriptCommand::List { shell, status, background, limit } => {
            let filter = ListFilter { status, background, limit };
            match orchestrator.list_scripts(&ShellId::new(shell), &filter) {
                Ok(scripts) => {
                    match format {
                        OutputFormat::Json => println!(
                            "{}",
                            serde_json::to_string(&scripts)
                                .map_err(|e| anyhow!("serializing scripts: {e}"))?
                        ),
                        OutputFormat::Text => {
                            for script in &scripts {
                                print_script(script, format);
                            }
                        }
                    }
                    Ok(0)
                }
                Err(e) => {
                    let code = exit_code_for_error(&e);
                    print_error(&e, format);
                    Ok(code)
                }
            }
        }
        ScriptCommand::Output { shell, script, since } => {
            let result =
                orchestrator.get_script_output(&ShellId::new(shell), &ScriptId::new(script), since);
            match result {
                Ok(view) => {
                    match format {
                        OutputFormat::Text => {
                            print!("{}", view.stdout);
                            eprint!("{}", view.stderr);
                        }
                        OutputFormat::Json => println!(
                            "{}",
                            json!({
                                "stdout": view.stdout,
                                "stderr": view.stderr,
                                "offset": view.offset,
                                "status": view.status,
                                "exitCode": view.exit_code,
                                "stdoutTruncated": view.stdout_truncated,
                                "stderrTruncated": view.stderr_truncated,
                            })
                        ),
                    }
                    Ok(0)
                }
                Err(e) => {
                    let code = exit_code_for_error(&e);
                    print_error(&e, format);
                    Ok(code)
                }
            }
        }
        ScriptCommand::Wait { shell, script, timeout_ms } => {
            let result = orchestrator
                .wait_script(
                    &ShellId::new(shell),
                    &ScriptId::new(script),
                    timeout_ms.map(Duration::from_millis),
                )
                .await;
            match result {
                Ok(script) => {
                    print_script(&script, format);
                    Ok(script.exit_code.unwrap_or(0))
                }
                Err(e) => {
                    let code = exit_code_for_error(&e);
                    print_error(&e, format);
                    Ok(code)
                }
            }
        }
        ScriptCommand::Kill { shell, script } => {
            match orchestrator.kill_script(&ShellId::new(shell), &ScriptId::new(script)).await {
                Ok(()) => Ok(0),
                Err(e) => {
                    let code = exit_code_for_error(&e);
                    print_error(&e, format);
                    Ok(code)
                }
            }
        }
    }
}
