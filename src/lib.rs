// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod events;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod pool;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, TargetArgs};
use crate::config::{default_config_path, load_or_default, ConfigReader};
use crate::exec::{CommandRunner, OutputChunk, OutputStream, ProcessBackend, RunOptions};
use crate::orchestrator::{BuildOptions, BuildOrchestrator};
use crate::types::ProjectRoot;

pub use crate::errors::{BuckError, Result as BuckResult};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - driver settings
/// - project root discovery
/// - runner / pool / orchestrator
/// - the requested subcommand
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_or_default(&config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    let runner = CommandRunner::from_config(&cfg, Arc::new(ProcessBackend));
    let orchestrator = BuildOrchestrator::new(runner, ConfigReader::default()).with_run_options(
        RunOptions {
            timeout: args.timeout.map(Duration::from_secs),
            ..Default::default()
        },
    );

    let start = std::fs::canonicalize(&args.root)
        .with_context(|| format!("resolving {}", args.root.display()))?;
    let root = orchestrator
        .get_root_for_path(&start)
        .with_context(|| format!("no .buckconfig found above {}", start.display()))?;
    info!(root = %root, "resolved project root");

    dispatch(&orchestrator, &root, args.command).await
}

async fn dispatch(orch: &BuildOrchestrator, root: &ProjectRoot, command: Command) -> Result<()> {
    match command {
        Command::Build(t) => {
            build_like(orch, root, t, BuildOptions::default()).await?;
        }
        Command::Test(t) => {
            let options = BuildOptions {
                test: true,
                ..Default::default()
            };
            build_like(orch, root, t, options).await?;
        }
        Command::Install {
            targets,
            udid,
            run,
            wait_for_debugger,
        } => {
            let options = BuildOptions {
                install: true,
                simulator: udid,
                run,
                debug: wait_for_debugger,
                ..Default::default()
            };
            build_like(orch, root, targets, options).await?;
        }
        Command::Run { targets, extra } => {
            relay(orch.run_with_output(root, &targets, extra)).await?;
        }
        Command::Query {
            query,
            args,
            attributes,
        } => {
            if !attributes.is_empty() {
                print_json(&orch.query_with_attributes(root, &query, &attributes).await?)?;
            } else if args.is_empty() {
                print_json(&orch.query(root, &query).await?)?;
            } else {
                print_json(&orch.query_with_args(root, &query, &args).await?)?;
            }
        }
        Command::Owner { file } => print_json(&orch.get_owner(root, &file).await?)?,
        Command::Aliases => print_json(&orch.list_aliases(root).await?)?,
        Command::ResolveAlias { alias } => println!("{}", orch.resolve_alias(root, &alias).await?),
        Command::RuleType { target } => {
            println!("{}", orch.build_rule_type_for(root, &target).await?)
        }
        Command::BuildFile { target } => match orch.get_build_file(root, &target).await {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("no build file found for {target}"),
        },
        Command::ShowOutput { target, extra } => {
            print_json(&orch.show_output(root, &target, extra).await?)?
        }
        Command::Flavors { targets } => print_json(&orch.list_flavors(root, &targets).await?)?,
        Command::Config { section, key } => match orch.get_buck_config(root, &section, &key)? {
            Some(value) => println!("{value}"),
            None => anyhow::bail!("{section}.{key} is not set"),
        },
        Command::Port => println!("{}", orch.get_http_server_port(root).await?),
        Command::Events => {
            let stream = orch.subscribe_to_build_events(root).await?;
            info!(addr = %stream.addr(), "streaming build events");
            let mut events = stream.subscribe();
            while let Some(event) = events.next().await {
                println!("{}", serde_json::to_string(&event)?);
            }
            debug!("event stream ended");
        }
    }
    Ok(())
}

/// Build/test/install, either streamed or returning the report.
async fn build_like(
    orch: &BuildOrchestrator,
    root: &ProjectRoot,
    target_args: TargetArgs,
    mut options: BuildOptions,
) -> Result<()> {
    let TargetArgs {
        targets,
        stream,
        extra,
    } = target_args;

    if stream {
        let output = if options.test {
            orch.test_with_output(root, &targets, extra)
        } else if options.install {
            orch.install_with_output(
                root,
                &targets,
                extra,
                options.simulator.take(),
                options.run,
                options.debug,
            )
        } else {
            orch.build_with_output(root, &targets, extra)
        };
        return relay(output).await;
    }

    options.extra_args = extra;
    let report = orch.build(root, &targets, &options).await?;
    print_json(&report)?;
    if !report.is_success() {
        anyhow::bail!("failed targets: {}", report.failed_targets().join(", "));
    }
    Ok(())
}

/// Copy streamed output to our stdout/stderr.
async fn relay(mut output: OutputStream) -> Result<()> {
    while let Some(chunk) = output.next().await {
        match chunk? {
            OutputChunk::Stdout(line) => println!("{line}"),
            OutputChunk::Stderr(line) => eprintln!("{line}"),
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
