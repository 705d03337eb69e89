// SPDX-License-Identifier: MIT

//! Structured error taxonomy (§7).
//!
//! Sandbox and validator failures are surfaced as data, not as flow-control
//! exceptions crossing the service boundary: every [`SafeShellError`] carries
//! a [`ErrorKind`], a human-readable message, and — for capability failures —
//! enough context to populate a `PendingRetry`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Taxonomy of error kinds, not type names (§7). Matched exhaustively at the
/// Orchestrator boundary to decide whether a `PendingRetry` should be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ConfigInvalid,
    PathBlocked,
    CommandBlocked,
    SubcommandBlocked,
    FlagDenied,
    FlagRequiredMissing,
    PathArgBlocked,
    ImportBlocked,
    Timeout,
    CapacityExceeded,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ConfigInvalid => "config-invalid",
            ErrorKind::PathBlocked => "path-blocked",
            ErrorKind::CommandBlocked => "command-blocked",
            ErrorKind::SubcommandBlocked => "subcommand-blocked",
            ErrorKind::FlagDenied => "flag-denied",
            ErrorKind::FlagRequiredMissing => "flag-required-missing",
            ErrorKind::PathArgBlocked => "path-arg-blocked",
            ErrorKind::ImportBlocked => "import-blocked",
            ErrorKind::Timeout => "timeout",
            ErrorKind::CapacityExceeded => "capacity-exceeded",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

impl ErrorKind {
    /// Whether a failure of this kind is eligible to become a `PendingRetry`
    /// (§4.4 step 3, §7 "capability failures").
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::CommandBlocked
                | ErrorKind::SubcommandBlocked
                | ErrorKind::FlagDenied
                | ErrorKind::FlagRequiredMissing
                | ErrorKind::PathArgBlocked
                | ErrorKind::ImportBlocked
        )
    }
}

/// Context a caller needs to obtain approval and call `retry` (§7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryInfo {
    pub retry_id: String,
}

/// The structured error surfaced across the service boundary.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct SafeShellError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryInfo>,
}

impl SafeShellError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry: None,
        }
    }

    pub fn with_retry(mut self, retry_id: impl Into<String>) -> Self {
        self.retry = Some(RetryInfo {
            retry_id: retry_id.into(),
        });
        self
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("no such {what}"))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
