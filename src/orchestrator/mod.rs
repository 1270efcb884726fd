// src/orchestrator/mod.rs

//! High-level buck operations.
//!
//! Every operation translates a request into an argument vector, runs it via
//! [`CommandRunner`] and interprets the result:
//!
//! - build/install/test are `Mutating` and serialized per root;
//! - query/audit/targets/server calls are `ReadOnly`;
//! - the `*_with_output` variants stream and bypass the pool.
//!
//! [`args`] holds the argument translation, [`report`] the build report and
//! its temp file, [`query`] the typed shapes of read-only output.

pub mod args;
pub mod query;
pub mod report;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ConfigReader;
use crate::errors::{BuckError, Result};
use crate::events::{EventStream, EventStreamClient};
use crate::exec::{CommandRunner, OutputStream, RunOptions};
use crate::types::{Access, ProjectRoot};

pub use args::{build_args, BuildOptions};
pub use query::{RuleAttributes, ServerStatus, TargetOutput, RULE_TYPE_ATTRIBUTE};
pub use report::{BuildReport, ReportFile, TargetResult};

use self::query::{fill_missing_args, normalize_target, parse_json, select_rule_type, split_lines};

#[derive(Debug, Clone)]
pub struct BuildOrchestrator {
    runner: CommandRunner,
    config: ConfigReader,
    options: RunOptions,
}

impl BuildOrchestrator {
    pub fn new(runner: CommandRunner, config: ConfigReader) -> Self {
        Self {
            runner,
            config,
            options: RunOptions::default(),
        }
    }

    /// Apply `options` (timeout, extra env) to every call made through this
    /// handle.
    pub fn with_run_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    async fn run_read_only(&self, root: &ProjectRoot, args: Vec<String>) -> Result<String> {
        let output = self
            .runner
            .run(root, Access::ReadOnly, args, self.options.clone())
            .await?;
        Ok(output.stdout)
    }

    /// Nearest ancestor of `path` holding a `.buckconfig`.
    pub fn get_root_for_path(&self, path: &Path) -> Option<ProjectRoot> {
        self.config.find_config_dir(path).map(ProjectRoot::new)
    }

    /// `section.key` from the project's `.buckconfig`; absent when there is
    /// no config file at all.
    pub fn get_buck_config(&self, root: &ProjectRoot, section: &str, key: &str) -> Result<Option<String>> {
        match self.config.get_config_value(root.path(), section, key) {
            Err(BuckError::ConfigNotFound(path)) => {
                warn!(path = %path.display(), "no .buckconfig found");
                Ok(None)
            }
            other => other,
        }
    }

    /// Build (or install/test, per `options`) and return the build report.
    ///
    /// A non-zero exit still returns the report if buck wrote one: with
    /// `--keep-going`, failing targets do not prevent a usable report. Only
    /// when the report is missing or empty (typically an unknown target name)
    /// is the command failure returned.
    pub async fn build(
        &self,
        root: &ProjectRoot,
        targets: &[String],
        options: &BuildOptions,
    ) -> Result<BuildReport> {
        let report = ReportFile::create()?;
        let result = self.build_into(root, targets, options, &report).await;
        report.remove();
        result
    }

    async fn build_into(
        &self,
        root: &ProjectRoot,
        targets: &[String],
        options: &BuildOptions,
        report: &ReportFile,
    ) -> Result<BuildReport> {
        let args = build_args(targets, options, Some(report.path()));
        info!(root = %root, subcommand = options.subcommand(), ?targets, "starting build");

        match self
            .runner
            .run(root, Access::Mutating, args, self.options.clone())
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_command_failure() && report.has_content() => {
                warn!(
                    root = %root,
                    error = %err,
                    "buck exited non-zero but wrote a build report; using the report"
                );
            }
            Err(err) => return Err(err),
        }

        let parsed = report.read()?;
        debug!(
            success = parsed.is_success(),
            failed = parsed.failed_targets().len(),
            "build report parsed"
        );
        Ok(parsed)
    }

    pub async fn install(
        &self,
        root: &ProjectRoot,
        targets: &[String],
        simulator: Option<String>,
        run: bool,
        debug: bool,
    ) -> Result<BuildReport> {
        let options = BuildOptions {
            install: true,
            simulator,
            run,
            debug,
            ..Default::default()
        };
        self.build(root, targets, &options).await
    }

    pub async fn test(
        &self,
        root: &ProjectRoot,
        targets: &[String],
        extra_args: Vec<String>,
    ) -> Result<BuildReport> {
        let options = BuildOptions {
            test: true,
            extra_args,
            ..Default::default()
        };
        self.build(root, targets, &options).await
    }

    fn stream_with(&self, root: &ProjectRoot, targets: &[String], options: &BuildOptions) -> OutputStream {
        let args = build_args(targets, options, None);
        self.runner.stream(root, args, self.options.clone())
    }

    pub fn build_with_output(
        &self,
        root: &ProjectRoot,
        targets: &[String],
        extra_args: Vec<String>,
    ) -> OutputStream {
        let options = BuildOptions {
            extra_args,
            ..Default::default()
        };
        self.stream_with(root, targets, &options)
    }

    pub fn test_with_output(
        &self,
        root: &ProjectRoot,
        targets: &[String],
        extra_args: Vec<String>,
    ) -> OutputStream {
        let options = BuildOptions {
            test: true,
            extra_args,
            ..Default::default()
        };
        self.stream_with(root, targets, &options)
    }

    pub fn install_with_output(
        &self,
        root: &ProjectRoot,
        targets: &[String],
        extra_args: Vec<String>,
        simulator: Option<String>,
        run: bool,
        debug: bool,
    ) -> OutputStream {
        let options = BuildOptions {
            install: true,
            simulator,
            run,
            debug,
            extra_args,
            ..Default::default()
        };
        self.stream_with(root, targets, &options)
    }

    /// `buck run <targets> <extra_args>`, streamed.
    pub fn run_with_output(
        &self,
        root: &ProjectRoot,
        targets: &[String],
        extra_args: Vec<String>,
    ) -> OutputStream {
        let mut args = vec!["run".to_string()];
        args.extend(targets.iter().cloned());
        args.extend(extra_args);
        self.runner.stream(root, args, self.options.clone())
    }

    /// `buck query --json <query>`.
    pub async fn query(&self, root: &ProjectRoot, query: &str) -> Result<Vec<String>> {
        let args = vec!["query".to_string(), "--json".to_string(), query.to_string()];
        let stdout = self.run_read_only(root, args).await?;
        parse_json(&stdout)
    }

    /// `buck query --json <query> <args...>`, where `query` contains `%s`.
    ///
    /// Every element of `args` is present in the result, with an empty list
    /// if it matched nothing.
    pub async fn query_with_args(
        &self,
        root: &ProjectRoot,
        query: &str,
        args: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut cmd = vec!["query".to_string(), "--json".to_string(), query.to_string()];
        cmd.extend(args.iter().cloned());
        let stdout = self.run_read_only(root, cmd).await?;
        let raw: BTreeMap<String, Vec<String>> = parse_json(&stdout)?;
        Ok(fill_missing_args(raw, args))
    }

    /// `buck query --json <query> --output-attributes <attrs...>`.
    pub async fn query_with_attributes(
        &self,
        root: &ProjectRoot,
        query: &str,
        attributes: &[String],
    ) -> Result<BTreeMap<String, Map<String, Value>>> {
        let mut cmd = vec![
            "query".to_string(),
            "--json".to_string(),
            query.to_string(),
            "--output-attributes".to_string(),
        ];
        cmd.extend(attributes.iter().cloned());
        let stdout = self.run_read_only(root, cmd).await?;
        parse_json(&stdout)
    }

    /// Targets owning `file_path` (`buck audit owner`).
    pub async fn get_owner(&self, root: &ProjectRoot, file_path: &str) -> Result<Vec<String>> {
        let args = vec![
            "audit".to_string(),
            "owner".to_string(),
            file_path.to_string(),
        ];
        let stdout = self.run_read_only(root, args).await?;
        Ok(split_lines(&stdout))
    }

    /// Absolute path of the build file defining `target`.
    ///
    /// Any failure is logged and reported as `None`.
    pub async fn get_build_file(&self, root: &ProjectRoot, target: &str) -> Option<PathBuf> {
        match self.query(root, &format!("buildfile({})", target)).await {
            Ok(files) => files.first().map(|rel| root.join(rel)),
            Err(e) => {
                warn!(root = %root, target, error = %e, "buildfile query failed");
                None
            }
        }
    }

    /// `buck audit alias --list`.
    pub async fn list_aliases(&self, root: &ProjectRoot) -> Result<Vec<String>> {
        let args = vec![
            "audit".to_string(),
            "alias".to_string(),
            "--list".to_string(),
        ];
        let stdout = self.run_read_only(root, args).await?;
        Ok(split_lines(&stdout))
    }

    /// `buck audit flavors --json <targets...>`.
    pub async fn list_flavors(&self, root: &ProjectRoot, targets: &[String]) -> Result<Value> {
        let mut args = vec![
            "audit".to_string(),
            "flavors".to_string(),
            "--json".to_string(),
        ];
        args.extend(targets.iter().cloned());
        let stdout = self.run_read_only(root, args).await?;
        parse_json(&stdout)
    }

    /// Fully-qualified target for an alias.
    ///
    /// Fails for flavored targets (`//a:b#flavor`); buck rejects those here.
    pub async fn resolve_alias(&self, root: &ProjectRoot, alias_or_target: &str) -> Result<String> {
        let args = vec![
            "targets".to_string(),
            "--resolve-alias".to_string(),
            alias_or_target.to_string(),
        ];
        let stdout = self.run_read_only(root, args).await?;
        Ok(stdout.trim().to_string())
    }

    /// `buck targets --json --show-output <target> <extra_args...>`.
    pub async fn show_output(
        &self,
        root: &ProjectRoot,
        alias_or_target: &str,
        extra_args: Vec<String>,
    ) -> Result<Vec<TargetOutput>> {
        let mut args = vec![
            "targets".to_string(),
            "--json".to_string(),
            "--show-output".to_string(),
            alias_or_target.to_string(),
        ];
        args.extend(extra_args);
        let stdout = self.run_read_only(root, args).await?;
        parse_json(&stdout)
    }

    /// Rule type (`buck.type`) of a target, e.g. `apple_binary`.
    pub async fn build_rule_type_for(&self, root: &ProjectRoot, alias_or_target: &str) -> Result<String> {
        let target = normalize_target(alias_or_target);
        let args = vec![
            "query".to_string(),
            target.clone(),
            "--json".to_string(),
            "--output-attributes".to_string(),
            RULE_TYPE_ATTRIBUTE.to_string(),
        ];
        let stdout = self.run_read_only(root, args).await?;
        let resolved: Map<String, Value> = parse_json(&stdout)?;
        select_rule_type(&target, &resolved)
    }

    /// Port of the daemon's HTTP server; `-1` when none is running.
    pub async fn get_http_server_port(&self, root: &ProjectRoot) -> Result<i32> {
        let args = vec![
            "server".to_string(),
            "status".to_string(),
            "--json".to_string(),
            "--http-port".to_string(),
        ];
        let stdout = self.run_read_only(root, args).await?;
        let status: ServerStatus = parse_json(&stdout)?;
        Ok(status.http_port)
    }

    /// Discover the daemon's port and connect to its event stream.
    pub async fn subscribe_to_build_events(&self, root: &ProjectRoot) -> Result<EventStream> {
        let port = self.get_http_server_port(root).await?;
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| BuckError::EventStream(format!("buck has no HTTP server (port {port})")))?;
        EventStreamClient::connect(port).await
    }
}
