// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `buck-rpc`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buck-rpc",
    version,
    about = "Drive buck builds, queries and event streams.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the driver settings file (TOML).
    ///
    /// Default: `BUCK_RPC_CONFIG`, else `buck-rpc.toml` in the current
    /// directory. A missing file means default settings.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Any path inside the project. The project root is the nearest ancestor
    /// containing `.buckconfig`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Give up on a buck invocation after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUCK_RPC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

/// Targets plus arguments forwarded to buck after them.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Print output as it arrives instead of returning the build report.
    #[arg(long)]
    pub stream: bool,

    /// Extra arguments appended to the buck command line (after `--`).
    #[arg(last = true)]
    pub extra: Vec<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build targets and print the build report.
    Build(TargetArgs),

    /// Run tests and print the build report.
    Test(TargetArgs),

    /// Install targets.
    Install {
        #[command(flatten)]
        targets: TargetArgs,

        /// Simulator or device id.
        #[arg(long)]
        udid: Option<String>,

        /// Launch after installing.
        #[arg(long)]
        run: bool,

        /// Wait for a debugger after launching (requires --run).
        #[arg(long, requires = "run")]
        wait_for_debugger: bool,
    },

    /// `buck run`, streamed.
    Run {
        #[arg(required = true)]
        targets: Vec<String>,

        #[arg(last = true)]
        extra: Vec<String>,
    },

    /// Run a query; with ARGS, the query must contain `%s`.
    Query {
        query: String,
        args: Vec<String>,

        /// Attributes to output per target (uses --output-attributes).
        #[arg(long = "attribute", value_name = "ATTR")]
        attributes: Vec<String>,
    },

    /// Targets owning a file.
    Owner { file: String },

    /// List aliases.
    Aliases,

    /// Resolve an alias to a fully-qualified target.
    ResolveAlias { alias: String },

    /// Print the rule type of a target.
    RuleType { target: String },

    /// Print the build file defining a target.
    BuildFile { target: String },

    /// Print the output paths of a target.
    ShowOutput {
        target: String,

        #[arg(last = true)]
        extra: Vec<String>,
    },

    /// List flavors of targets.
    Flavors {
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Read a value from `.buckconfig`.
    Config { section: String, key: String },

    /// Print the daemon's HTTP port.
    Port,

    /// Print live build events as JSON lines until the connection closes.
    Events,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
