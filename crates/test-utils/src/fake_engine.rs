use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use futures::stream;
use buck_rpc::errors::{BuckError, Result};
use buck_rpc::exec::{CommandOutput, EngineBackend, Invocation, OutputChunk, OutputStream};

/// Canned answer for one subcommand.
#[derive(Debug, Clone, Default)]
pub struct Scripted {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Written to the `--build-report` path before "exiting".
    pub report: Option<String>,
    /// Simulated run time.
    pub delay: Option<Duration>,
    /// Lines emitted by streaming calls.
    pub chunks: Vec<OutputChunk>,
}

impl Scripted {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            ..Default::default()
        }
    }

    pub fn failing(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
            ..Default::default()
        }
    }

    pub fn with_report(mut self, report: impl Into<String>) -> Self {
        self.report = Some(report.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<OutputChunk>) -> Self {
        self.chunks = chunks;
        self
    }
}

/// One call seen by the fake.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub invocation: Invocation,
    pub started: Instant,
    pub finished: Option<Instant>,
}

/// A fake engine that:
/// - answers each call from a script keyed by subcommand (`build`, `query`, ...)
/// - writes scripted build reports to the `--build-report` path
/// - records every invocation with start/finish times
/// - tracks the peak number of overlapping calls.
///
/// Unscripted subcommands succeed with empty output.
#[derive(Debug, Default)]
pub struct FakeEngine {
    script: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, subcommand: &str, response: Scripted) -> Self {
        self.set(subcommand, response);
        self
    }

    pub fn set(&self, subcommand: &str, response: Scripted) {
        self.script
            .lock()
            .unwrap()
            .insert(subcommand.to_string(), response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Argument vectors of every call, in start order.
    pub fn args(&self) -> Vec<Vec<String>> {
        self.calls().into_iter().map(|c| c.invocation.args).collect()
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn response_for(&self, invocation: &Invocation) -> Scripted {
        let key = invocation.subcommand().unwrap_or_default();
        self.script
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn record_start(&self, invocation: &Invocation) -> usize {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        let mut calls = self.calls.lock().unwrap();
        calls.push(RecordedCall {
            invocation: invocation.clone(),
            started: Instant::now(),
            finished: None,
        });
        calls.len() - 1
    }

    fn record_finish(&self, index: usize) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if let Some(call) = self.calls.lock().unwrap().get_mut(index) {
            call.finished = Some(Instant::now());
        }
    }
}

impl EngineBackend for FakeEngine {
    fn execute(
        &self,
        invocation: Invocation,
    ) -> Pin<Box<dyn Future<Output = Result<CommandOutput>> + Send + '_>> {
        Box::pin(async move {
            let response = self.response_for(&invocation);
            let index = self.record_start(&invocation);

            if let Some(delay) = response.delay {
                tokio::time::sleep(delay).await;
            }

            if let (Some(report), Some(path)) =
                (&response.report, invocation.flag_value("--build-report"))
            {
                std::fs::write(path, report)?;
            }

            self.record_finish(index);

            Ok(CommandOutput {
                stdout: response.stdout,
                stderr: response.stderr,
                exit_code: Some(response.exit_code),
            })
        })
    }

    fn stream(&self, invocation: Invocation) -> OutputStream {
        let response = self.response_for(&invocation);
        let index = self.record_start(&invocation);
        self.record_finish(index);

        let mut items: Vec<Result<OutputChunk>> =
            response.chunks.into_iter().map(Ok).collect();
        if response.exit_code != 0 {
            items.push(Err(BuckError::CommandFailed {
                args: invocation.args,
                stdout: String::new(),
                stderr: response.stderr,
                exit_code: Some(response.exit_code),
            }));
        }
        Box::pin(stream::iter(items))
    }
}
