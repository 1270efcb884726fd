// src/exec/stream.rs

//! Long-lived buck processes whose output is relayed line by line.
//!
//! The returned stream is lazy: nothing is spawned until it is first polled,
//! and every call to [`spawn_output_stream`] starts a fresh process.
//!
//! - Each stdout/stderr line becomes one [`OutputChunk`].
//! - Exit code 0 ends the stream normally.
//! - Any other exit yields a final `Err(CommandFailed)` carrying all stderr
//!   seen so far.
//! - Dropping the stream kills the process.

use std::pin::Pin;
use std::process::Stdio;

use futures::stream::{self, Stream, TryStreamExt};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{BuckError, Result};
use crate::exec::invocation::Invocation;

/// One line of process output, tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputChunk {
    Stdout(String),
    Stderr(String),
}

pub type OutputStream = Pin<Box<dyn Stream<Item = Result<OutputChunk>> + Send>>;

/// Build the `tokio::process::Command` for an invocation.
///
/// The child gets exactly `invocation.env`, nothing inherited.
pub(crate) fn build_command(invocation: &Invocation) -> Command {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(&invocation.cwd)
        .env_clear()
        .envs(&invocation.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

pub(crate) fn spawn_error(invocation: &Invocation, source: std::io::Error) -> BuckError {
    BuckError::Spawn {
        program: invocation.program.display().to_string(),
        source,
    }
}

/// Lazily spawn `invocation` and stream its output.
pub fn spawn_output_stream(invocation: Invocation) -> OutputStream {
    let start = stream::once(async move { start_process(invocation) });
    Box::pin(start.try_flatten())
}

fn start_process(invocation: Invocation) -> Result<OutputStream> {
    info!(
        cwd = %invocation.cwd.display(),
        args = ?invocation.args,
        "starting streaming buck process"
    );

    let mut child = build_command(&invocation)
        .spawn()
        .map_err(|e| spawn_error(&invocation, e))?;

    let (tx, rx) = mpsc::unbounded_channel::<Result<OutputChunk>>();

    let stdout_task = child
        .stdout
        .take()
        .map(|out| tokio::spawn(forward_lines(out, tx.clone(), OutputChunk::Stdout)));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(forward_lines(err, tx.clone(), OutputChunk::Stderr)));

    let args = invocation.args;
    tokio::spawn(async move {
        // Either the process finishes on its own, or the consumer goes away
        // and we stop it.
        let finished = tokio::select! {
            res = async {
                if let Some(task) = stdout_task {
                    let _ = task.await;
                }
                let stderr = match stderr_task {
                    Some(task) => task.await.unwrap_or_default(),
                    None => String::new(),
                };
                (stderr, child.wait().await)
            } => Some(res),
            _ = tx.closed() => None,
        };

        match finished {
            Some((_, Ok(status))) if status.success() => {
                debug!(args = ?args, "streaming buck process exited cleanly");
            }
            Some((stderr, Ok(status))) => {
                info!(args = ?args, exit_code = ?status.code(), "streaming buck process failed");
                let _ = tx.send(Err(BuckError::CommandFailed {
                    args,
                    stdout: String::new(),
                    stderr,
                    exit_code: status.code(),
                }));
            }
            Some((_, Err(e))) => {
                let _ = tx.send(Err(BuckError::Io(e)));
            }
            None => {
                debug!(args = ?args, "output stream dropped; killing buck process");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill streaming buck process");
                }
            }
        }
    });

    Ok(receiver_stream(rx))
}

/// Forward each line of `reader` as a chunk, returning everything read
/// joined by newlines.
async fn forward_lines<R>(
    reader: R,
    tx: mpsc::UnboundedSender<Result<OutputChunk>>,
    wrap: fn(String) -> OutputChunk,
) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut seen = Vec::new();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                seen.push(line.clone());
                // Keep draining even if the consumer is gone so the pipe
                // never fills.
                let _ = tx.send(Ok(wrap(line)));
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "error reading buck output");
                break;
            }
        }
    }

    seen.join("\n")
}

pub(crate) fn receiver_stream<T: Send + 'static>(
    rx: mpsc::UnboundedReceiver<T>,
) -> Pin<Box<dyn Stream<Item = T> + Send>> {
    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}
