// src/exec/backend.rs

//! Pluggable process backend.
//!
//! `CommandRunner` talks to an `EngineBackend` instead of spawning processes
//! itself. Production uses [`ProcessBackend`]; tests swap in a fake that
//! answers from a script and records when each call ran.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::errors::Result;
use crate::exec::invocation::{CommandOutput, Invocation};
use crate::exec::stream::{build_command, spawn_error, spawn_output_stream, OutputStream};

/// Trait abstracting how buck is actually executed.
pub trait EngineBackend: Send + Sync {
    /// Run to completion and capture output.
    ///
    /// A non-zero exit is *not* an error at this level; it is reported via
    /// `CommandOutput::exit_code`. Only failing to launch is an error.
    fn execute(
        &self,
        invocation: Invocation,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + '_>>;

    /// Start a long-lived call and stream its output.
    fn stream(&self, invocation: Invocation) -> OutputStream;
}

/// Backend that runs real OS processes through `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct ProcessBackend;

impl EngineBackend for ProcessBackend {
    fn execute(
        &self,
        invocation: Invocation,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + '_>> {
        Box::pin(async move {
            let child = build_command(&invocation)
                .spawn()
                .map_err(|e| spawn_error(&invocation, e))?;

            // kill_on_drop: abandoning this future stops the process.
            let output = child.wait_with_output().await?;

            let result = CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            };

            debug!(
                args = ?invocation.args,
                exit_code = ?result.exit_code,
                stdout_len = result.stdout.len(),
                stderr_len = result.stderr.len(),
                "buck process exited"
            );

            Ok(result)
        })
    }

    fn stream(&self, invocation: Invocation) -> OutputStream {
        spawn_output_stream(invocation)
    }
}
