// tests/config_loading.rs

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use buck_rpc::config::{load_and_validate, load_or_default};
use buck_rpc::errors::BuckError;
use buck_rpc::exec::env::{is_daemon_disabled, original_env};
use buck_rpc::exec::{CommandRunner, ProcessBackend};
use buck_rpc::types::Access;
use tempfile::NamedTempFile;

fn settings(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", body).unwrap();
    file
}

#[test]
fn full_settings_file_is_loaded() {
    let file = settings(
        r#"
[engine]
path = "/opt/buck/bin/buck"
no_daemon = true

[pool]
read_only_capacity = 3

[env]
BUCK_EXTRA_JAVA_ARGS = "-Xmx4g"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.engine.path, PathBuf::from("/opt/buck/bin/buck"));
    assert!(cfg.engine.no_daemon);
    assert_eq!(cfg.pool.read_only_capacity, Some(3));
    assert_eq!(cfg.env["BUCK_EXTRA_JAVA_ARGS"], "-Xmx4g");
}

#[test]
fn empty_file_gives_defaults() {
    let file = settings("");
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.engine.path, PathBuf::from("buck"));
    assert!(!cfg.engine.no_daemon);
    assert!(cfg.pool.read_only_capacity.is_none());
    assert!(cfg.env.is_empty());
}

#[test]
fn missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_or_default(dir.path().join("buck-rpc.toml")).unwrap();
    assert_eq!(cfg.engine.path, PathBuf::from("buck"));
}

#[test]
fn zero_capacity_is_rejected() {
    let file = settings("[pool]\nread_only_capacity = 0\n");
    match load_and_validate(file.path()) {
        Err(BuckError::Config(msg)) => assert!(msg.contains("read_only_capacity")),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn invalid_env_name_is_rejected() {
    let file = settings("[env]\n\"A=B\" = \"x\"\n");
    match load_and_validate(file.path()) {
        Err(BuckError::Config(msg)) => assert!(msg.contains("A=B")),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let file = settings("[engine\npath = ");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(BuckError::Toml(_))
    ));
}

#[test]
fn runner_capacity_follows_settings() {
    let file = settings("[engine]\nno_daemon = true\n\n[pool]\nread_only_capacity = 3\n");
    let cfg = load_and_validate(file.path()).unwrap();
    let runner = CommandRunner::from_config(&cfg, Arc::new(ProcessBackend));
    assert_eq!(runner.pool().capacity(Access::ReadOnly), 1);
    assert_eq!(runner.pool().capacity(Access::Mutating), 1);

    let file = settings("[pool]\nread_only_capacity = 3\n");
    let cfg = load_and_validate(file.path()).unwrap();
    let runner = CommandRunner::from_config(&cfg, Arc::new(ProcessBackend));
    if !is_daemon_disabled(original_env()) {
        assert_eq!(runner.pool().capacity(Access::ReadOnly), 3);
    }
}
