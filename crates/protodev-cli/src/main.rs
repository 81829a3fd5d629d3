use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use protodev_mcp::ServerConfig;

mod commands;

#[derive(Parser, Debug)]
#[command(author, version, about = "MCP server for the protodev dev container")]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Command,
}

/// Configuration overrides shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Directory whose subdirectories are reported as projects.
    #[arg(long, global = true)]
    pub projects_dir: Option<PathBuf>,

    /// Root directory snapshotted by workspace://structure.
    #[arg(long, global = true)]
    pub workspace_dir: Option<PathBuf>,

    /// Container runtime CLI used by container_list (docker, podman, ...).
    #[arg(long, global = true)]
    pub container_runtime: Option<String>,

    /// Interpreter used by run_script, invoked as `<interpreter> -c <code>`.
    #[arg(long, global = true)]
    pub interpreter: Option<String>,

    /// Kill subprocesses that run longer than this many seconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub command_timeout: Option<u64>,

    /// Tracing filter (e.g. `debug`, `protodev_mcp=trace`); overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

impl GlobalOptions {
    /// Environment configuration with command-line overrides applied
    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::from_env();
        if let Some(dir) = &self.projects_dir {
            config.projects_dir = dir.clone();
        }
        if let Some(dir) = &self.workspace_dir {
            config.workspace_root = dir.clone();
        }
        if let Some(runtime) = &self.container_runtime {
            config.container_runtime = runtime.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = interpreter.clone();
        }
        if let Some(secs) = self.command_timeout {
            config.command_timeout = Some(Duration::from_secs(secs));
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server over stdio.
    Mcp,
    /// Print the tool descriptors as JSON.
    Tools,
    /// Print the resource descriptors as JSON.
    Resources,
    /// Read one resource and print its contents.
    Resource {
        /// Resource URI, e.g. container://info.
        uri: String,
    },
    /// Call one tool and print the result envelope.
    Call {
        /// Tool name, e.g. list_projects.
        name: String,
        /// Tool arguments as a JSON object.
        #[arg(long)]
        args: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::mcp::configure_tracing(cli.global.log_level.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    let result = runtime.block_on(run(cli));

    // A stdin read parked on the blocking pool cannot be cancelled; waiting
    // for it would keep the process alive after Ctrl-C.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Mcp => commands::mcp::run_mcp_server(&cli.global).await,
        Command::Tools => commands::inspect::print_tools(&cli.global),
        Command::Resources => commands::inspect::print_resources(&cli.global),
        Command::Resource { uri } => commands::inspect::read_resource(&cli.global, uri).await,
        Command::Call { name, args } => {
            commands::inspect::call_tool(&cli.global, &name, args.as_deref()).await
        }
    }
}
