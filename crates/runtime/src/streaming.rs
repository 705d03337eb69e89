// SPDX-License-Identifier: MIT

//! C9 Streaming Runtime (§4.9).
//!
//! The central execution primitive: spawn a child, drain stdout and stderr
//! concurrently, race a single deadline against both, and guarantee the
//! four-step cleanup (kill, cancel stdout, cancel stderr, await status) on
//! every exit path — success, error, cancellation, or timeout.

use safeshell_core::{ErrorKind, SafeShellError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const DRAIN_CHUNK_SIZE: usize = 8192;
/// Event channel depth; large enough that a normal process's output doesn't
/// stall its reader task waiting on a slow consumer.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What to spawn and where.
#[derive(Debug, Clone)]
pub struct ChildSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
}

/// One event from the drain sequence (§4.9).
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    /// Always the last event on a normal completion; never sent on timeout
    /// or explicit kill (those surface through the result instead).
    Exit(i32),
}

/// How execution ended, for callers that don't need the raw event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Exited(i32),
    /// Killed via the `kill` handle (`killScript`); conventionally recorded
    /// with exit code -1 (§8 "Cancellation").
    Killed,
}

/// A live, in-flight execution: the event stream, a kill switch, and a
/// handle that resolves once cleanup is complete.
pub struct StreamingRun {
    pub pid: u32,
    pub events: mpsc::Receiver<StreamEvent>,
    kill_tx: Option<oneshot::Sender<()>>,
    join: JoinHandle<Result<RunOutcome, SafeShellError>>,
}

impl StreamingRun {
    /// Request that the child be killed (`killScript`). No-op if the run
    /// already completed.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Await completion: `Ok(Exited(code))` on normal exit, `Ok(Killed)` if
    /// `kill` won the race, `Err(Timeout)` if the deadline elapsed.
    pub async fn join(self) -> Result<RunOutcome, SafeShellError> {
        self.join
            .await
            .unwrap_or_else(|e| Err(SafeShellError::internal(format!("drain task panicked: {e}"))))
    }
}

/// Spawn `spec` and begin draining (§4.9). Returns immediately; the
/// returned [`StreamingRun`] streams events as they arrive.
pub fn spawn_streaming(spec: ChildSpec, timeout: Duration) -> Result<StreamingRun, SafeShellError> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .env_clear()
        .envs(&spec.env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        SafeShellError::new(
            ErrorKind::Internal,
            format!("spawning '{}': {e}", spec.program),
        )
    })?;

    let pid = child.id().unwrap_or(0);
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SafeShellError::internal("child stdout not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SafeShellError::internal("child stderr not piped"))?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (kill_tx, kill_rx) = oneshot::channel();

    let join = tokio::spawn(drive(child, stdout, stderr, tx, timeout, kill_rx));

    Ok(StreamingRun {
        pid,
        events: rx,
        kill_tx: Some(kill_tx),
        join,
    })
}

async fn drive(
    mut child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    tx: mpsc::Sender<StreamEvent>,
    timeout: Duration,
    kill_rx: oneshot::Receiver<()>,
) -> Result<RunOutcome, SafeShellError> {
    let stdout_task = tokio::spawn(drain_stream(stdout, tx.clone(), StreamEvent::Stdout as fn(Vec<u8>) -> StreamEvent));
    let stderr_task = tokio::spawn(drain_stream(stderr, tx.clone(), StreamEvent::Stderr as fn(Vec<u8>) -> StreamEvent));

    tokio::pin!(kill_rx);
    let sleep = tokio::time::sleep(timeout);
    tokio::pin!(sleep);

    tokio::select! {
        status = child.wait() => {
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            match status {
                Ok(status) => {
                    let code = status.code().unwrap_or(-1);
                    let _ = tx.send(StreamEvent::Exit(code)).await;
                    Ok(RunOutcome::Exited(code))
                }
                Err(e) => Err(SafeShellError::internal(format!("waiting on child: {e}"))),
            }
        }
        _ = &mut sleep => {
            cleanup(&mut child, stdout_task, stderr_task).await;
            Err(SafeShellError::new(ErrorKind::Timeout, "execution timed out"))
        }
        _ = &mut kill_rx => {
            cleanup(&mut child, stdout_task, stderr_task).await;
            Ok(RunOutcome::Killed)
        }
    }
}

/// The four-step cleanup from §4.9: SIGKILL (tolerating an already-exited
/// child), cancel stdout, cancel stderr, await the status future. Every step
/// tolerates an already-closed resource.
async fn cleanup(
    child: &mut Child,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
) {
    let _ = child.start_kill();
    stdout_task.abort();
    stderr_task.abort();
    let _ = child.wait().await;
}

async fn drain_stream<R: tokio::io::AsyncRead + Unpin>(
    mut reader: R,
    tx: mpsc::Sender<StreamEvent>,
    wrap: fn(Vec<u8>) -> StreamEvent,
) {
    let mut buf = vec![0u8; DRAIN_CHUNK_SIZE];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(wrap(buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

/// Non-streaming wrapper (§4.9): drive a [`StreamingRun`] to completion and
/// accumulate every chunk into one record.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub code: i32,
    pub success: bool,
}

pub async fn run_to_completion(
    spec: ChildSpec,
    timeout: Duration,
) -> Result<ExecutionResult, SafeShellError> {
    let mut run = spawn_streaming(spec, timeout)?;
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    while let Some(event) = run.events.recv().await {
        match event {
            StreamEvent::Stdout(chunk) => stdout.extend_from_slice(&chunk),
            StreamEvent::Stderr(chunk) => stderr.extend_from_slice(&chunk),
            StreamEvent::Exit(_) => {}
        }
    }

    let outcome = run.join().await?;
    let code = match outcome {
        RunOutcome::Exited(code) => code,
        RunOutcome::Killed => -1,
    };

    Ok(ExecutionResult {
        stdout,
        stderr,
        code,
        success: code == 0,
    })
}

#[cfg(test)]
#[path = "streaming_tests.rs"]
mod tests;
