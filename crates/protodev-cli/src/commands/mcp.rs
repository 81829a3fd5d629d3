use anyhow::{Context, Result};
use protodev_mcp::{run_server_loop, McpServerState, StdioTransport};

use crate::GlobalOptions;

/// Configure tracing to write only to stderr.
pub fn configure_tracing(log_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = if let Some(level) = log_level {
        EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level))?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    Ok(())
}

/// Public entrypoint orchestrating the MCP server lifecycle
pub async fn run_mcp_server(global: &GlobalOptions) -> Result<()> {
    let config = global.server_config();
    tracing::info!("Starting protodev MCP server v{}", env!("CARGO_PKG_VERSION"));

    let server = McpServerState::new(config);
    run_server_loop(StdioTransport::stdio(), server)
        .await
        .context("MCP server loop failed")
}
