//! Supervised execution of the external prediction tool.
//!
//! [`run`] spawns the tool, captures its combined stdout/stderr line by
//! line as it is produced (the tool runs for minutes; buffering the whole
//! lifetime in the OS pipe is not acceptable), and returns the captured
//! text together with the exit code once the process terminates.
//!
//! A failure to launch at all (binary missing, permission denied) is a
//! distinct error, never conflated with a nonzero exit code.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;

/// Maximum captured log size (10 MiB). Output beyond this is dropped to
/// prevent memory exhaustion from extremely verbose runs.
const MAX_LOG_BYTES: usize = 10 * 1024 * 1024;

/// Execution limits for one run. The default imposes no timeout and never
/// cancels; callers opt in to either.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum wall-clock time before the process is killed.
    pub timeout: Option<Duration>,
    /// External cancellation; when triggered the process is killed.
    pub cancel: CancellationToken,
}

/// Captured output of a terminated process.
#[derive(Debug)]
pub struct RunOutput {
    /// Combined stdout/stderr, in arrival order.
    pub logs: String,
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
}

/// Errors from supervising a run. The `Timeout` and `Cancelled` variants
/// carry whatever logs were captured before the process was killed so the
/// caller can persist them.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to launch process: {0}")]
    Launch(std::io::Error),

    #[error("I/O error while supervising process: {0}")]
    Io(std::io::Error),

    #[error("process killed after exceeding timeout ({elapsed_ms}ms)")]
    Timeout { elapsed_ms: u64, logs: String },

    #[error("process killed by cancellation")]
    Cancelled { logs: String },
}

/// Spawn `command` and supervise it to completion.
pub async fn run(command: &ToolCommand, options: RunOptions) -> Result<RunOutput, RunError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(RunError::Launch)?;
    tracing::debug!(program = %command.program, pid = child.id(), "Spawned process");

    // Both streams feed one channel so the captured log preserves arrival
    // order across stdout and stderr.
    let (tx, mut rx) = mpsc::channel::<String>(64);
    spawn_line_reader(child.stdout.take(), tx.clone());
    spawn_line_reader(child.stderr.take(), tx);

    let mut logs = String::new();

    let waited = match options.timeout {
        Some(limit) => {
            match tokio::time::timeout(
                limit,
                supervise(&mut child, &mut rx, &mut logs, &options.cancel),
            )
            .await
            {
                Ok(waited) => waited,
                Err(_elapsed) => {
                    let _ = child.kill().await;
                    return Err(RunError::Timeout {
                        elapsed_ms: start.elapsed().as_millis() as u64,
                        logs,
                    });
                }
            }
        }
        None => supervise(&mut child, &mut rx, &mut logs, &options.cancel).await,
    };

    match waited {
        Waited::Exited(Ok(status)) => Ok(RunOutput {
            logs,
            exit_code: status.code().unwrap_or(-1),
        }),
        Waited::Exited(Err(e)) => Err(RunError::Io(e)),
        Waited::Cancelled => {
            let _ = child.kill().await;
            Err(RunError::Cancelled { logs })
        }
    }
}

enum Waited {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
}

/// Drain captured lines until both streams close, then reap the child.
async fn supervise(
    child: &mut Child,
    rx: &mut mpsc::Receiver<String>,
    logs: &mut String,
    cancel: &CancellationToken,
) -> Waited {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Waited::Cancelled,
            maybe_line = rx.recv() => match maybe_line {
                Some(line) => append_capped(logs, &line),
                // Channel closed: both pipes reached EOF, the process is
                // exiting (or has exited).
                None => break,
            },
        }
    }

    tokio::select! {
        _ = cancel.cancelled() => Waited::Cancelled,
        status = child.wait() => Waited::Exited(status),
    }
}

/// Read one pipe line by line, forwarding each line as it arrives.
fn spawn_line_reader<R>(handle: Option<R>, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(handle) = handle else { return };
        let mut lines = BufReader::new(handle).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
}

fn append_capped(logs: &mut String, line: &str) {
    if logs.len() >= MAX_LOG_BYTES {
        return;
    }
    logs.push_str(line);
    logs.push('\n');
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
