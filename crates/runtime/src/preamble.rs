// SPDX-License-Identifier: MIT

//! C7 Preamble Generator (§4.7).
//!
//! Produces the initialization text prepended to every user fragment before
//! it reaches the Script Materializer (C8). This module has no knowledge of
//! how the child runtime executes the result — it only emits deterministic
//! text, so the same inputs always content-address to the same script (L4).

use std::collections::HashMap;

/// The sentinel key the preamble stores the resolved allowed-command set
/// under, for the child's own in-child re-validation (§9).
pub const CONFIG_SENTINEL: &str = "__safesh_config__";

pub struct PreambleContext<'a> {
    pub shell_id: &'a str,
    pub cwd: &'a str,
    pub vars: &'a HashMap<String, String>,
    pub allowed_commands: &'a [String],
}

/// A generated preamble plus its line count, so the runtime can remap a
/// child stack trace's line numbers back to the user fragment (§4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub text: String,
    pub line_count: usize,
}

/// Build the preamble for `ctx`. Deterministic: identical inputs always
/// produce identical text (L4 depends on this).
pub fn generate(ctx: &PreambleContext<'_>) -> Preamble {
    let mut lines = Vec::new();
    lines.push("const $ = (() => {".to_string());
    lines.push(format!("  const ID = {};", js_string(ctx.shell_id)));
    lines.push(format!("  const CWD = {};", js_string(ctx.cwd)));
    lines.push("  const ENV = new Proxy({}, {".to_string());
    lines.push("    get: (_t, key) => process.env[key],".to_string());
    lines.push("    set: (_t, key, value) => { process.env[key] = value; return true; },".to_string());
    lines.push("  });".to_string());
    lines.push(format!("  const VARS = {};", js_object(ctx.vars)));
    lines.push(format!(
        "  const {} = {};",
        CONFIG_SENTINEL,
        js_array(ctx.allowed_commands)
    ));
    lines.push("  return { ID, CWD, ENV, VARS, [Symbol.for(\"safeshell.config\")]: ".to_string()
        + CONFIG_SENTINEL
        + " };");
    lines.push("})();".to_string());

    let text = lines.join("\n") + "\n";
    let line_count = text.lines().count();
    Preamble { text, line_count }
}

fn js_string(raw: &str) -> String {
    format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
}

fn js_array(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| js_string(v)).collect();
    format!("[{}]", items.join(", "))
}

fn js_object(map: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    let entries: Vec<String> = keys
        .into_iter()
        .map(|k| format!("{}: {}", js_string(k), js_string(&map[k])))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

#[cfg(test)]
#[path = "preamble_tests.rs"]
mod tests;
