// tests/process_backend.rs

#![cfg(unix)]

mod common;
use crate::common::*;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use buck_rpc::errors::BuckError;
use buck_rpc::exec::{CommandRunner, OutputChunk, ProcessBackend, RunOptions};
use buck_rpc::pool::ConcurrencyPool;
use buck_rpc::types::{Access, ProjectRoot};
use futures::StreamExt;

/// Runner whose "buck" is `sh`, so args are `-c <script>`.
fn sh_runner(env: BTreeMap<String, String>) -> CommandRunner {
    CommandRunner::new(
        Arc::new(ProcessBackend),
        Arc::new(ConcurrencyPool::new(2)),
        "sh",
        env,
    )
}

fn path_env() -> BTreeMap<String, String> {
    std::env::var("PATH")
        .map(|p| BTreeMap::from([("PATH".to_string(), p)]))
        .unwrap_or_default()
}

fn script(body: &str) -> Vec<String> {
    vec!["-c".to_string(), body.to_string()]
}

fn tmp_root() -> (tempfile::TempDir, ProjectRoot) {
    let dir = tempfile::tempdir().unwrap();
    let root = ProjectRoot::new(dir.path());
    (dir, root)
}

#[tokio::test]
async fn captures_stdout_in_project_root() {
    init_tracing();
    let (_dir, root) = tmp_root();
    let runner = sh_runner(path_env());

    let out = runner
        .run(&root, Access::ReadOnly, script("pwd; echo hello"), RunOptions::default())
        .await
        .unwrap();

    assert!(out.success());
    let lines: Vec<&str> = out.stdout.lines().collect();
    assert_eq!(
        std::fs::canonicalize(lines[0]).unwrap(),
        std::fs::canonicalize(root.path()).unwrap()
    );
    assert_eq!(lines[1], "hello");
}

#[tokio::test]
async fn child_sees_only_the_given_environment() {
    init_tracing();
    let (_dir, root) = tmp_root();
    let mut env = path_env();
    env.insert("FROM_BASE".into(), "base".into());
    let runner = sh_runner(env);

    let options = RunOptions {
        env: BTreeMap::from([("FROM_CALL".to_string(), "call".to_string())]),
        ..Default::default()
    };
    let out = runner
        .run(
            &root,
            Access::ReadOnly,
            script(r#"echo "$FROM_BASE $FROM_CALL ${CARGO_MANIFEST_DIR:-unset}""#),
            options,
        )
        .await
        .unwrap();

    assert_eq!(out.stdout.trim(), "base call unset");
}

#[tokio::test]
async fn non_zero_exit_is_command_failure() {
    init_tracing();
    let (_dir, root) = tmp_root();
    let runner = sh_runner(path_env());

    let err = runner
        .run(
            &root,
            Access::Mutating,
            script("echo partial; echo broken >&2; exit 3"),
            RunOptions::default(),
        )
        .await
        .unwrap_err();

    match err {
        BuckError::CommandFailed {
            stdout,
            stderr,
            exit_code,
            ..
        } => {
            assert_eq!(stdout.trim(), "partial");
            assert_eq!(stderr.trim(), "broken");
            assert_eq!(exit_code, Some(3));
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_program_is_spawn_error() {
    init_tracing();
    let (_dir, root) = tmp_root();
    let runner = CommandRunner::new(
        Arc::new(ProcessBackend),
        Arc::new(ConcurrencyPool::new(1)),
        "/nonexistent/buck",
        BTreeMap::new(),
    );

    let err = runner
        .run(&root, Access::ReadOnly, vec!["query".into()], RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BuckError::Spawn { .. }), "got {:?}", err);
}

#[tokio::test]
async fn timeout_kills_long_call() {
    init_tracing();
    let (_dir, root) = tmp_root();
    let runner = sh_runner(path_env());

    let options = RunOptions {
        timeout: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    let err = with_timeout(runner.run(&root, Access::ReadOnly, script("sleep 10"), options))
        .await
        .unwrap_err();
    assert!(matches!(err, BuckError::Timeout { .. }), "got {:?}", err);
}

#[tokio::test]
async fn stream_relays_lines_from_both_pipes() {
    init_tracing();
    let (_dir, root) = tmp_root();
    let runner = sh_runner(path_env());

    let chunks: Vec<_> = with_timeout(
        runner
            .stream(&root, script("echo out1; echo err1 >&2; echo out2"), RunOptions::default())
            .collect::<Vec<_>>(),
    )
    .await;

    let chunks: Vec<OutputChunk> = chunks.into_iter().map(Result::unwrap).collect();
    let stdout: Vec<&OutputChunk> = chunks
        .iter()
        .filter(|c| matches!(c, OutputChunk::Stdout(_)))
        .collect();
    assert_eq!(
        stdout,
        vec![
            &OutputChunk::Stdout("out1".into()),
            &OutputChunk::Stdout("out2".into())
        ]
    );
    assert!(chunks.contains(&OutputChunk::Stderr("err1".into())));
}

#[tokio::test]
async fn failing_stream_ends_with_error_carrying_stderr() {
    init_tracing();
    let (_dir, root) = tmp_root();
    let runner = sh_runner(path_env());

    let items: Vec<_> = with_timeout(
        runner
            .stream(
                &root,
                script("echo working; echo first >&2; echo second >&2; exit 2"),
                RunOptions::default(),
            )
            .collect::<Vec<_>>(),
    )
    .await;

    let (last, before) = items.split_last().unwrap();
    assert_eq!(before.len(), 3);
    assert!(before.iter().all(Result::is_ok));
    match last {
        Err(BuckError::CommandFailed {
            stderr, exit_code, ..
        }) => {
            assert_eq!(stderr, "first\nsecond");
            assert_eq!(*exit_code, Some(2));
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn stream_is_lazy_and_restartable() {
    init_tracing();
    let (dir, root) = tmp_root();
    let runner = sh_runner(path_env());
    let marker = dir.path().join("count");
    let body = format!("echo x >> {}; echo run", marker.display());

    let stream = runner.stream(&root, script(&body), RunOptions::default());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!marker.exists(), "process started before first poll");

    let first: Vec<_> = with_timeout(stream.collect::<Vec<_>>()).await;
    assert_eq!(first.len(), 1);

    let second: Vec<_> = with_timeout(
        runner
            .stream(&root, script(&body), RunOptions::default())
            .collect::<Vec<_>>(),
    )
    .await;
    assert_eq!(second.len(), 1);

    let runs = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(runs.lines().count(), 2);
}

#[tokio::test]
async fn streaming_missing_program_yields_spawn_error() {
    init_tracing();
    let (_dir, root) = tmp_root();
    let runner = CommandRunner::new(
        Arc::new(ProcessBackend),
        Arc::new(ConcurrencyPool::new(1)),
        "/nonexistent/buck",
        BTreeMap::new(),
    );

    let items: Vec<_> = runner
        .stream(&root, vec!["build".into()], RunOptions::default())
        .collect()
        .await;
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(BuckError::Spawn { .. })));
}
