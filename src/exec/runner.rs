// src/exec/runner.rs

//! Command construction and pooled execution.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::DriverConfig;
use crate::errors::{BuckError, Result};
use crate::exec::backend::EngineBackend;
use crate::exec::env::{is_daemon_disabled, merged_env, original_env};
use crate::exec::invocation::{CommandOutput, Invocation};
use crate::exec::stream::OutputStream;
use crate::pool::{default_read_only_capacity, ConcurrencyPool};
use crate::types::{Access, ProjectRoot};

/// Per-call knobs.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Abandon (and kill) the call after this long.
    pub timeout: Option<Duration>,
    /// Extra environment for this call only.
    pub env: BTreeMap<String, String>,
}

/// Builds buck invocations and executes them.
///
/// Run-to-completion calls go through the [`ConcurrencyPool`]; streaming
/// calls do not, since they may run indefinitely.
#[derive(Clone)]
pub struct CommandRunner {
    backend: Arc<dyn EngineBackend>,
    pool: Arc<ConcurrencyPool>,
    program: PathBuf,
    base_env: BTreeMap<String, String>,
}

impl fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRunner")
            .field("program", &self.program)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    /// `base_env` is the complete environment every invocation starts from.
    pub fn new(
        backend: Arc<dyn EngineBackend>,
        pool: Arc<ConcurrencyPool>,
        program: impl Into<PathBuf>,
        base_env: BTreeMap<String, String>,
    ) -> Self {
        Self {
            backend,
            pool,
            program: program.into(),
            base_env,
        }
    }

    /// Wire a runner from driver settings.
    ///
    /// The environment is the host's original environment plus `[env]`, and
    /// the read-only capacity honours both `[engine].no_daemon` and
    /// `NO_BUCKD` in that environment.
    pub fn from_config(config: &DriverConfig, backend: Arc<dyn EngineBackend>) -> Self {
        let base_env = merged_env(original_env(), &config.env);
        let no_daemon = config.engine.no_daemon || is_daemon_disabled(&base_env);
        let capacity = config
            .pool
            .read_only_capacity
            .unwrap_or_else(|| default_read_only_capacity(no_daemon));
        let capacity = if no_daemon { 1 } else { capacity };

        info!(
            program = %config.engine.path.display(),
            no_daemon,
            read_only_capacity = capacity,
            "configured buck runner"
        );

        Self::new(
            backend,
            Arc::new(ConcurrencyPool::new(capacity)),
            config.engine.path.clone(),
            base_env,
        )
    }

    pub fn pool(&self) -> &Arc<ConcurrencyPool> {
        &self.pool
    }

    /// Assemble the invocation for `args` in `root`.
    pub fn invocation(&self, root: &ProjectRoot, args: Vec<String>, options: &RunOptions) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args,
            cwd: root.path().to_path_buf(),
            env: merged_env(&self.base_env, &options.env),
            timeout: options.timeout,
        }
    }

    /// Run to completion in the `(root, access)` queue.
    ///
    /// A non-zero exit becomes `BuckError::CommandFailed` with the captured
    /// output attached.
    pub async fn run(
        &self,
        root: &ProjectRoot,
        access: Access,
        args: Vec<String>,
        options: RunOptions,
    ) -> Result<CommandOutput> {
        let invocation = self.invocation(root, args, &options);
        let args = invocation.args.clone();

        debug!(root = %root, ?access, args = ?args, "queueing buck invocation");
        let output = self
            .pool
            .submit(root, access, self.execute(invocation))
            .await??;

        if output.success() {
            return Ok(output);
        }

        info!(root = %root, args = ?args, exit_code = ?output.exit_code, "buck invocation failed");
        Err(BuckError::CommandFailed {
            args,
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
        })
    }

    async fn execute(&self, invocation: Invocation) -> Result<CommandOutput> {
        info!(
            cwd = %invocation.cwd.display(),
            args = ?invocation.args,
            "running buck"
        );
        match invocation.timeout {
            Some(after) => {
                let args = invocation.args.clone();
                tokio::time::timeout(after, self.backend.execute(invocation))
                    .await
                    .map_err(|_| BuckError::Timeout { args, after })?
            }
            None => self.backend.execute(invocation).await,
        }
    }

    /// Start a streaming call. Not pooled.
    pub fn stream(&self, root: &ProjectRoot, args: Vec<String>, options: RunOptions) -> OutputStream {
        let invocation = self.invocation(root, args, &options);
        debug!(root = %root, args = ?invocation.args, "opening buck output stream");
        self.backend.stream(invocation)
    }
}
