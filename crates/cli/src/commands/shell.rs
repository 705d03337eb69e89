// SPDX-License-Identifier: MIT

//! `safesh shell`: lifecycle operations on persistent caller-scoped shells
//! (§4.11).

use crate::output::{exit_code_for_error, print_error, print_shell, OutputFormat};
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use safeshell_core::ShellId;
use safeshell_manager::Orchestrator;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ShellArgs {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    /// Create a new shell.
    Start {
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Repeatable `KEY=VALUE` environment entries.
        #[arg(long = "env", value_parser = parse_env_kv)]
        env: Vec<(String, String)>,
    },
    /// Patch an existing shell's cwd and/or env.
    Update {
        id: String,
        #[arg(long)]
        cwd: Option<PathBuf>,
        #[arg(long = "env", value_parser = parse_env_kv)]
        env: Vec<(String, String)>,
    },
    /// Kill all running scripts and remove a shell.
    End { id: String },
    /// List all known shells.
    List,
}

fn parse_env_kv(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

pub async fn run(orchestrator: &Orchestrator, args: ShellArgs, format: OutputFormat) -> Result<i32> {
    match args.command {
        ShellCommand::Start { cwd, env } => {
            let env = (!env.is_empty()).then(|| env.into_iter().collect::<HashMap<_, _>>());
            match orchestrator.start_shell(cwd, env) {
                Ok(shell) => {
                    print_shell(&shell, format);
                    Ok(0)
                }
                Err(e) => {
                    let code = exit_code_for_error(&e);
                    print_error(&e, format);
                    Ok(code)
                }
            }
        }
        ShellCommand::Update { id, cwd, env } => {
            let env = (!env.is_empty()).then(|| env.into_iter().collect::<HashMap<_, _>>());
            match orchestrator.update_shell(&ShellId::new(id), cwd, env) {
                Ok(()) => Ok(0),
                Err(e) => {
                    let code = exit_code_for_error(&e);
                    print_error(&e, format);
                    Ok(code)
                }
            }
        }
        ShellCommand::End { id } => match orchestrator.end_shell(&ShellId::new(id)).await {
            Ok(()) => Ok(0),
            Err(e) => {
                let code = exit_code_for_error(&e);
                print_error(&e, format);
                Ok(code)
            }
        },
        ShellCommand::List => {
            let shells = orchestrator.list_shells();
            match format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string(&shells).map_err(|e| anyhow!("serializing shells: {e}"))?
                    );
                }
                OutputFormat::Text => {
                    for shell in &shells {
                        print_shell(shell, format);
                    }
                }
            }
            Ok(0)
        }
    }
}
