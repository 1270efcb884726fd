use std::collections::BTreeMap;
use std::sync::Arc;

use buck_rpc::config::ConfigReader;
use buck_rpc::exec::CommandRunner;
use buck_rpc::fs::MockFileSystem;
use buck_rpc::orchestrator::BuildOrchestrator;
use buck_rpc::pool::ConcurrencyPool;
use serde_json::{json, Map, Value};

use crate::fake_engine::FakeEngine;

/// Runner over `engine` with the given read-only capacity and an empty
/// environment.
pub fn runner(engine: Arc<FakeEngine>, read_only_capacity: usize) -> CommandRunner {
    CommandRunner::new(
        engine,
        Arc::new(ConcurrencyPool::new(read_only_capacity)),
        "buck",
        BTreeMap::new(),
    )
}

/// Orchestrator over `engine` whose `.buckconfig` lookups go to `fs`.
pub fn orchestrator_with_fs(
    engine: Arc<FakeEngine>,
    read_only_capacity: usize,
    fs: MockFileSystem,
) -> BuildOrchestrator {
    BuildOrchestrator::new(
        runner(engine, read_only_capacity),
        ConfigReader::new(Arc::new(fs)),
    )
}

pub fn orchestrator(engine: Arc<FakeEngine>, read_only_capacity: usize) -> BuildOrchestrator {
    orchestrator_with_fs(engine, read_only_capacity, MockFileSystem::new())
}

/// Builder for build report JSON.
pub struct ReportBuilder {
    results: Map<String, Value>,
    failures: Map<String, Value>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            results: Map::new(),
            failures: Map::new(),
        }
    }

    pub fn built(mut self, target: &str, output: &str) -> Self {
        self.results.insert(
            target.to_string(),
            json!({ "success": "SUCCESS", "type": "BUILT_LOCALLY", "output": output }),
        );
        self
    }

    pub fn failed(mut self, target: &str, reason: &str) -> Self {
        self.results
            .insert(target.to_string(), json!({ "success": "FAIL" }));
        self.failures
            .insert(target.to_string(), Value::String(reason.to_string()));
        self
    }

    pub fn build(self) -> String {
        json!({
            "success": self.failures.is_empty(),
            "results": self.results,
            "failures": self.failures,
        })
        .to_string()
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buck_rpc::orchestrator::BuildReport;

    #[test]
    fn report_builder_output_parses() {
        let raw = ReportBuilder::new()
            .built("//app:app", "buck-out/app")
            .failed("//lib:lib", "boom")
            .build();
        let report = BuildReport::parse(&raw).unwrap();
        assert!(!report.is_success());
        assert_eq!(report.failed_targets(), vec!["//lib:lib"]);
        assert_eq!(report.results["//app:app"].kind.as_deref(), Some("BUILT_LOCALLY"));
    }

    #[test]
    fn orchestrator_helper_has_no_config() {
        let orch = orchestrator(Arc::new(FakeEngine::new()), 2);
        assert!(orch.get_root_for_path(std::path::Path::new("/nowhere")).is_none());
    }
}
