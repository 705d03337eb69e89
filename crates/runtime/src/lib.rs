// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! safeshell-runtime: preamble generation, script materialization, and the
//! streaming execution primitive (spec §4.7-§4.10).
//!
//! This crate has no knowledge of policy or shells — it takes a prepared
//! child-process spec and a piece of code text, and turns them into bytes on
//! disk and a running process. `safeshell-manager` wires it to the rest of
//! the service.

pub mod materializer;
pub mod output_buffer;
pub mod preamble;
pub mod streaming;

pub use materializer::{content_hash, materialize};
pub use output_buffer::{OutputBuffer, OutputRead};
pub use preamble::{generate as generate_preamble, Preamble, PreambleContext, CONFIG_SENTINEL};
pub use streaming::{
    run_to_completion, spawn_streaming, ChildSpec, ExecutionResult, RunOutcome, StreamEvent,
    StreamingRun,
};
