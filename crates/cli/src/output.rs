// SPDX-License-Identifier: MIT

//! Output formatting: plain text (stdout/stderr passthrough) or one JSON
//! object per invocation, selected with `-o`/`--output`.

use clap::ValueEnum;
use safeshell_core::{ErrorKind, SafeShellError, Script, Shell};
use safeshell_manager::ExecOutcome;
use serde_json::json;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print an `exec`/`run`/`task`/`retry` result and return the process exit
/// code for it (§6 "exit code convention").
pub fn print_exec_outcome(outcome: &ExecOutcome, format: OutputFormat) -> i32 {
    match outcome {
        ExecOutcome::Foreground { stdout, stderr, code, success, script_id } => {
            match format {
                OutputFormat::Text => {
                    print!("{stdout}");
                    eprint!("{stderr}");
                }
                OutputFormat::Json => {
                    println!(
                        "{}",
                        json!({
                            "scriptId": script_id.as_str(),
                            "stdout": stdout,
                            "stderr": stderr,
                            "exitCode": code,
                            "success": success,
                        })
                    );
                }
            }
            *code
        }
        ExecOutcome::Background { script_id, pid, shell_id } => {
            match format {
                OutputFormat::Text => {
                    println!("started {script_id} (pid {pid}) on {shell_id}");
                }
                OutputFormat::Json => {
                    println!(
                        "{}",
                        json!({ "scriptId": script_id.as_str(), "pid": pid, "shellId": shell_id.as_str() })
                    );
                }
            }
            0
        }
    }
}

pub fn print_shell(shell: &Shell, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!(
            "{}\t{}\t{} scripts",
            shell.id,
            shell.cwd.display(),
            shell.scripts.len()
        ),
        OutputFormat::Json => println!("{}", json!(shell)),
    }
}

/// Exit code for a failed operation (§6 "exit code convention"): timeouts
/// get the sentinel code a shell would use for a deadline kill, everything
/// else is a generic failure (a successful but nonzero child exit code is
/// handled separately, via `ExecOutcome::Foreground.code`).
pub fn exit_code_for_error(err: &SafeShellError) -> i32 {
    match err.kind {
        ErrorKind::Timeout => 124,
        _ => 1,
    }
}

pub fn print_error(err: &SafeShellError, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            eprint!("error: {}: {}", err.kind, err.message);
            match &err.retry {
                Some(retry) => eprintln!(" (retry id: {})", retry.retry_id),
                None => eprintln!(),
            }
        }
        OutputFormat::Json => {
            eprintln!(
                "{}",
                json!({
                    "error": {
                        "kind": err.kind.to_string(),
                        "message": err.message,
                        "retryId": err.retry.as_ref().map(|r| r.retry_id.clone()),
                    }
                })
            );
        }
    }
}

pub fn print_script(script: &Script, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!(
            "{}\t{:?}\t{}",
            script.id,
            script.status,
            script.code.lines().next().unwrap_or("")
        ),
        OutputFormat::Json => println!("{}", json!(script)),
    }
}
