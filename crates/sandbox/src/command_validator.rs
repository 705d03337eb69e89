// SPDX-License-Identifier: MIT

//! C4 Command Validator (§4.4).
//!
//! Whitelist enforcement at command/subcommand/flag/path-argument
//! granularity. A command that is not whitelisted, or that fails any
//! configured subcommand/flag/path-arg rule, is reported with enough detail
//! for the Orchestrator to build a `PendingRetry`.

use crate::path_resolver::PathContext;
use crate::policy_store::ResolvedPolicy;
use crate::sandbox_checker::{self, PathMode};
use safeshell_core::{ErrorKind, SafeShellError, SubcommandAllow};
use std::collections::HashSet;
use std::path::Path;

/// Output of [`validate_command`]: either the command clears every
/// configured rule, or the first failing rule is reported.
#[derive(Debug, Clone)]
pub enum CommandValidation {
    Allowed,
    Blocked(SafeShellError),
}

impl CommandValidation {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CommandValidation::Allowed)
    }

    pub fn into_result(self) -> Result<(), SafeShellError> {
        match self {
            CommandValidation::Allowed => Ok(()),
            CommandValidation::Blocked(err) => Err(err),
        }
    }
}

/// Flags that mark the argument immediately following them as write-like
/// (§C "Output-like flag set").
const OUTPUT_LIKE_FLAGS: &[&str] = &["-o", "--output", "--out"];

/// Commands whose sole/last path-shaped argument is conservatively treated
/// as write-like even without an explicit output flag (§C).
const COMMANDS_WITH_WRITE_LAST_ARG: &[&str] = &["cp", "mv", "tee"];

/// Validate `command args` against the resolved policy (§4.4 *validate*).
///
/// `session_allowed` carries commands approved via `retry` during the
/// current process lifetime (§C "Session allowed commands") — these count
/// as implicitly allowed alongside `resolved.all_allowed_commands`.
pub fn validate_command(
    command: &str,
    args: &[String],
    resolved: &ResolvedPolicy,
    session_allowed: &HashSet<String>,
    ctx: &PathContext,
) -> CommandValidation {
    if !resolved.all_allowed_commands.contains(command) && !session_allowed.contains(command) {
        return CommandValidation::Blocked(SafeShellError::new(
            ErrorKind::CommandBlocked,
            format!("command '{command}' is not in the allowed-commands set"),
        ));
    }

    let Some(rule) = resolved.policy.external.get(command) else {
        return CommandValidation::Allowed;
    };

    if let SubcommandAllow::List(allowed_subcommands) = &rule.allow {
        match args.first() {
            Some(sub) if allowed_subcommands.contains(sub) => {}
            _ => {
                return CommandValidation::Blocked(SafeShellError::new(
                    ErrorKind::SubcommandBlocked,
                    format!("'{command}' subcommand is not in the allowed list"),
                ));
            }
        }
    }

    for arg in args {
        if rule.deny_flags.contains(arg) {
            return CommandValidation::Blocked(SafeShellError::new(
                ErrorKind::FlagDenied,
                format!("flag '{arg}' is denied for '{command}'"),
            ));
        }
    }

    for required in &rule.require_flags {
        if !args.contains(required) {
            return CommandValidation::Blocked(SafeShellError::new(
                ErrorKind::FlagRequiredMissing,
                format!("'{command}' requires flag '{required}'"),
            ));
        }
    }

    let Some(path_args) = &rule.path_args else {
        return CommandValidation::Allowed;
    };

    let candidates = detect_path_arg_indices(args, path_args);
    if !path_args.validate_sandbox {
        return CommandValidation::Allowed;
    }

    for &idx in &candidates {
        let arg = &args[idx];
        let mode = classify_mode(command, args, idx);
        let roots = match mode {
            PathMode::Read => &resolved.read_roots,
            PathMode::Write => &resolved.write_roots,
        };
        if let Err(err) = sandbox_checker::validate_path(arg, mode, roots, ctx) {
            return CommandValidation::Blocked(SafeShellError::new(
                ErrorKind::PathArgBlocked,
                format!("argument '{arg}' to '{command}': {}", err.message),
            ));
        }
    }

    CommandValidation::Allowed
}

fn detect_path_arg_indices(
    args: &[String],
    path_args: &safeshell_core::PathArgsConfig,
) -> Vec<usize> {
    if let Some(positions) = &path_args.positions {
        return positions
            .iter()
            .copied()
            .filter(|&i| i < args.len())
            .collect();
    }
    if !path_args.auto_detect {
        return Vec::new();
    }
    args.iter()
        .enumerate()
        .filter(|(_, a)| looks_path_shaped(a))
        .map(|(i, _)| i)
        .collect()
}

fn looks_path_shaped(arg: &str) -> bool {
    arg.contains('/') || arg.starts_with('.') || Path::new(arg).exists()
}

/// Classify a detected path argument at `idx` as read- or write-like
/// (§4.4 "conservative default is write"). Every detected path argument is
/// write-like — checked against the narrower `write_roots` — unless it is
/// positively known to be read-only input; nothing in the known-flag/
/// known-command sets below is a read classification, so this function
/// only ever widens from the default, never narrows it.
fn classify_mode(command: &str, args: &[String], idx: usize) -> PathMode {
    if idx > 0 {
        if let Some(prev) = args.get(idx - 1) {
            if OUTPUT_LIKE_FLAGS.contains(&prev.as_str()) {
                return PathMode::Write;
            }
        }
    }
    if COMMANDS_WITH_WRITE_LAST_ARG.contains(&command) && idx == args.len() - 1 {
        return PathMode::Write;
    }
    PathMode::Write
}

#[cfg(test)]
#[path = "command_validator_tests.rs"]
mod tests;
