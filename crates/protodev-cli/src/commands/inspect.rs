//! One-shot subcommands that exercise the dispatcher without a client
//!
//! Output is pretty-printed JSON on stdout. Protocol-level errors are
//! returned as `anyhow` errors so the process exits non-zero; operational
//! failures print their `isError` envelope and exit normally.

use anyhow::{anyhow, bail, Context, Result};
use protodev_mcp::{Error, McpServerState};
use serde_json::{Map, Value};

use crate::GlobalOptions;

fn server(global: &GlobalOptions) -> McpServerState {
    McpServerState::new(global.server_config())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

fn protocol_error(e: Error) -> anyhow::Error {
    anyhow!("{} (JSON-RPC code {})", e.message, e.code.0)
}

pub fn print_tools(global: &GlobalOptions) -> Result<()> {
    print_json(&server(global).dispatcher().tools().descriptors())
}

pub fn print_resources(global: &GlobalOptions) -> Result<()> {
    print_json(&server(global).dispatcher().resources().descriptors())
}

/// Read a resource and print its contents
pub async fn read_resource(global: &GlobalOptions, uri: String) -> Result<()> {
    let contents = server(global)
        .dispatcher()
        .read_resource(uri)
        .await
        .map_err(protocol_error)?;
    print_json(&contents)
}

/// Call a tool with optional JSON object arguments and print the envelope
pub async fn call_tool(global: &GlobalOptions, name: &str, args: Option<&str>) -> Result<()> {
    let arguments = parse_arguments(args)?;
    let result = server(global)
        .dispatcher()
        .call_tool(name, arguments)
        .await
        .map_err(protocol_error)?;

    if result.is_error {
        tracing::warn!("Tool {} reported an error", name);
    }
    print_json(&result)
}

fn parse_arguments(args: Option<&str>) -> Result<Map<String, Value>> {
    let Some(raw) = args else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(raw).context("--args must be valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--args must be a JSON object, got {}", other),
    }
}
