#![allow(dead_code)]

pub use buck_rpc_test_utils::builders::{orchestrator, orchestrator_with_fs, runner, ReportBuilder};
pub use buck_rpc_test_utils::fake_engine::{FakeEngine, RecordedCall, Scripted};
pub use buck_rpc_test_utils::{init_tracing, with_timeout};

use std::path::PathBuf;

use buck_rpc::types::ProjectRoot;

pub fn root() -> ProjectRoot {
    ProjectRoot::new("/repo")
}

pub fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// The `--build-report` path passed to the engine on call `index`.
pub fn report_path(call: &RecordedCall) -> PathBuf {
    PathBuf::from(
        call.invocation
            .flag_value("--build-report")
            .expect("call had no --build-report"),
    )
}
