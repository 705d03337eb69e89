// SPDX-License-Identifier: MIT

//! `safesh`: command-line front end over the in-process Orchestrator.
//!
//! Unlike this workspace's daemon-backed sibling, SafeShell has no
//! long-running server to dial into: the Orchestrator constructs its own
//! state (policy, snapshot, shell/retry managers) for the lifetime of one
//! invocation and `flush()`s a snapshot before exit (§4.12 "explicit init
//! and shutdown hooks").

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use output::OutputFormat;
use safeshell_manager::Orchestrator;
use std::path::PathBuf;
use std::process::ExitCode;

/// Sandboxed execution service for AI assistants: run commands and code
/// fragments against a policy-enforced sandbox.
#[derive(Debug, Parser)]
#[command(name = "safesh", version, about)]
struct Cli {
    /// Project directory (defaults to the current directory). Policy and
    /// state live under `<dir>/.safeshell`.
    #[arg(short = 'C', long = "dir", global = true)]
    dir: Option<PathBuf>,

    #[arg(short = 'o', long = "output", global = true, value_enum, default_value_t)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Exec(commands::exec::ExecArgs),
    Run(commands::run::RunArgs),
    Task(commands::task::TaskArgs),
    Retry(commands::retry::RetryArgs),
    Shell(commands::shell::ShellArgs),
    Script(commands::script::ScriptArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = cli.dir.unwrap_or(std::env::current_dir()?);
    let orchestrator = Orchestrator::new(dir)?;

    let exit_code = match cli.command {
        Commands::Exec(args) => commands::exec::run(&orchestrator, args, cli.output).await?,
        Commands::Run(args) => commands::run::run(&orchestrator, args, cli.output).await?,
        Commands::Task(args) => commands::task::run(&orchestrator, args, cli.output).await?,
        Commands::Retry(args) => commands::retry::run(&orchestrator, args, cli.output).await?,
        Commands::Shell(args) => commands::shell::run(&orchestrator, args, cli.output).await?,
        Commands::Script(args) => commands::script::run(&orchestrator, args, cli.output).await?,
    };

    orchestrator.flush()?;

    let code = u8::try_from(exit_code).unwrap_or(255);
    Ok(ExitCode::from(code))
}
