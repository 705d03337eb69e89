//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the `safesh` binary against a temporary
//! project directory, mirroring the CLI-builder pattern this workspace's
//! reference sibling uses for its own black-box specs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Returns the path to the `safesh` binary built alongside the test binary.
fn safesh_binary() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug/safesh");
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("safesh");
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

/// Create a CLI builder for `safesh` commands.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// Fluent builder over a single `safesh` invocation.
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    json: bool,
}

impl CliBuilder {
    fn new() -> Self {
        Self { args: Vec::new(), dir: None, json: false }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    /// Select `-o json` output so results can be parsed structurally.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = Command::new(safesh_binary());
        if self.json {
            cmd.args(["-o", "json"]);
        }
        if let Some(dir) = &self.dir {
            cmd.args(["-C"]).arg(dir);
        }
        cmd.args(&self.args);
        cmd
    }

    pub fn run(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("safesh should spawn");
        RunAssert { output }
    }

    pub fn passes(self) -> RunAssert {
        let assert = self.run();
        assert!(
            assert.output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            assert.output.status.code(),
            assert.stdout(),
            assert.stderr(),
        );
        assert
    }

    pub fn fails(self) -> RunAssert {
        let assert = self.run();
        assert!(
            !assert.output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            assert.stdout(),
            assert.stderr(),
        );
        assert
    }
}

/// Result of one `safesh` invocation, with chaining assertions.
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    /// Parse stdout as a single JSON value (requires `.json()` on the builder).
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(self.stdout().trim())
            .unwrap_or_else(|e| panic!("stdout was not JSON: {e}\nstdout: {}", self.stdout()))
    }

    /// Parse stderr as a single JSON value (the `error` object, in JSON mode).
    pub fn json_err(&self) -> serde_json::Value {
        serde_json::from_str(self.stderr().trim())
            .unwrap_or_else(|e| panic!("stderr was not JSON: {e}\nstderr: {}", self.stderr()))
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        assert!(
            self.stdout().contains(expected),
            "stdout does not contain '{expected}'\nstdout: {}",
            self.stdout()
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        assert!(
            self.stderr().contains(expected),
            "stderr does not contain '{expected}'\nstderr: {}",
            self.stderr()
        );
        self
    }
}

/// A temporary project directory with a `.safeshell/` state dir.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    /// A project with no policy file (falls back to the `standard` preset).
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    /// A project whose `.safeshell/policy.toml` is `contents`.
    pub fn with_policy(contents: &str) -> Self {
        let project = Self::empty();
        project.write_policy(contents);
        project
    }

    pub fn write_policy(&self, contents: &str) {
        let state_dir = self.dir.path().join(".safeshell");
        std::fs::create_dir_all(&state_dir).expect("create .safeshell");
        std::fs::write(state_dir.join("policy.toml"), contents).expect("write policy.toml");
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.dir.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(full_path, content).expect("write file");
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.dir.path().join(path.as_ref()).exists()
    }

    pub fn git_init(&self) {
        Command::new("git")
            .args(["init"])
            .current_dir(self.path())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .expect("git init should run");
    }

    /// Run `safesh` scoped to this project.
    pub fn safesh(&self) -> CliBuilder {
        cli().dir(self.path())
    }
}

/// Poll a condition until it returns true or the timeout elapses.
pub fn wait_for<F>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    false
}

/// Minimal permissive-preset policy: every `run_whitelist`/`script_background`
/// scenario that just needs a pre-approved coreutils command uses this.
pub const PERMISSIVE_POLICY: &str = r#"
preset = "permissive"
"#;
