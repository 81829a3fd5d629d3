//! MCP tool implementations for the dev container
//!
//! This module defines the four tools exposed by the MCP server:
//! - container_list: List containers via the container runtime CLI
//! - run_script: Execute a snippet with the scripting interpreter
//! - list_projects: List project directories under the projects root
//! - check_tool: Report whether a command is on PATH and its version
//!
//! Handlers return `Ok(ToolResult)` for every valid request, using
//! [`ToolResult::failure`] when the underlying operation fails. `Err` is
//! reserved for protocol misuse such as missing arguments.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::process::{resolve_on_path, ProcessRunner};
use crate::types::*;
use crate::{Error, Result};

pub const CONTAINER_LIST: &str = "container_list";
pub const RUN_SCRIPT: &str = "run_script";
pub const LIST_PROJECTS: &str = "list_projects";
pub const CHECK_TOOL: &str = "check_tool";

/// Output template passed to `<runtime> ps --format`
pub const CONTAINER_FORMAT: &str = r"table {{.Names}}\t{{.Image}}\t{{.Status}}";

/// A callable tool bound to a name
pub trait ToolHandler: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute with arguments already checked against the input schema
    fn call(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<ToolResult>>;
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Immutable set of tools keyed by name, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four dev container tools
    pub fn with_defaults(config: &ServerConfig, runner: ProcessRunner) -> Self {
        let handlers: [Arc<dyn ToolHandler>; 4] = [
            Arc::new(ContainerListTool::new(
                config.container_runtime.clone(),
                runner.clone(),
            )),
            Arc::new(RunScriptTool::new(config.interpreter.clone(), runner.clone())),
            Arc::new(ListProjectsTool::new(config.projects_dir.clone())),
            Arc::new(CheckToolTool::new(runner)),
        ];

        let tools = handlers
            .into_iter()
            .map(|handler| RegisteredTool {
                descriptor: handler.descriptor(),
                handler,
            })
            .collect();
        Self { tools }
    }

    /// Add a tool; names must be unique
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let descriptor = handler.descriptor();
        if self.get(descriptor.name).is_some() {
            return Err(Error::internal(format!(
                "tool '{}' is already registered",
                descriptor.name
            )));
        }
        self.tools.push(RegisteredTool {
            descriptor,
            handler,
        });
        Ok(())
    }

    /// Look up a tool by name, returning its descriptor and handler
    pub fn get(&self, name: &str) -> Option<(&ToolDescriptor, Arc<dyn ToolHandler>)> {
        self.tools
            .iter()
            .find(|t| t.descriptor.name == name)
            .map(|t| (&t.descriptor, Arc::clone(&t.handler)))
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }
}

// ============================================================================
// SCHEMA HELPERS
// ============================================================================

/// JSON schema advertised for an input type
pub fn input_schema<T: JsonSchema>() -> Value {
    let mut schema = schemars::schema_for!(T).to_value();
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("type").or_insert_with(|| Value::from("object"));
        obj.entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
    }
    schema
}

/// Check required presence and declared JSON types of `arguments`
pub fn validate_arguments(schema: &Value, arguments: &Map<String, Value>) -> Result<()> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if matches!(arguments.get(name), None | Some(Value::Null)) {
                return Err(Error::missing_argument(name));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (name, value) in arguments {
        // null on an optional property means "not given"
        if value.is_null() {
            continue;
        }
        let Some(expected) = properties.get(name).and_then(|p| p.get("type")) else {
            continue;
        };
        if !type_matches(expected, value) {
            return Err(Error::invalid_argument(
                name,
                format!("expected {}", describe_type(expected)),
            ));
        }
    }

    Ok(())
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(t) => json_type_is(t, value),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| json_type_is(t, value)),
        _ => true,
    }
}

fn json_type_is(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.as_str().unwrap_or("a valid value").to_string(),
    }
}

fn parse_input<T: DeserializeOwned>(mut arguments: Map<String, Value>) -> Result<T> {
    arguments.retain(|_, value| !value.is_null());
    serde_json::from_value(Value::Object(arguments)).map_err(|e| Error::invalid_params(e.to_string()))
}

/// First non-blank line of `text`, trimmed
fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

// ============================================================================
// container_list
// ============================================================================

/// Container listing tool handler
pub struct ContainerListTool {
    runtime: String,
    runner: ProcessRunner,
}

impl ContainerListTool {
    pub fn new(runtime: String, runner: ProcessRunner) -> Self {
        Self { runtime, runner }
    }

    pub async fn execute(&self, input: ContainerListInput) -> ToolResult {
        debug!("Listing containers via {} (all: {})", self.runtime, input.all);

        let mut args = vec!["ps"];
        if input.all {
            args.push("-a");
        }
        args.extend(["--format", CONTAINER_FORMAT]);

        let outcome = self.runner.run(&self.runtime, &args).await;
        if !outcome.succeeded() {
            return ToolResult::failure(format!(
                "Container runtime error: {}\nIs the {} daemon running?",
                outcome.failure_detail(),
                self.runtime
            ));
        }

        if outcome.stdout.trim().is_empty() {
            ToolResult::success("No containers found")
        } else {
            ToolResult::success(outcome.stdout)
        }
    }
}

impl ToolHandler for ContainerListTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: CONTAINER_LIST,
            description: "List running containers (uses the container runtime CLI)",
            input_schema: input_schema::<ContainerListInput>(),
        }
    }

    fn call(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let input: ContainerListInput = parse_input(arguments)?;
            Ok(self.execute(input).await)
        })
    }
}

// ============================================================================
// run_script
// ============================================================================

/// Script execution tool handler
///
/// The code is handed to the interpreter as a single `-c` argument; no shell
/// ever sees it.
pub struct RunScriptTool {
    interpreter: String,
    runner: ProcessRunner,
}

impl RunScriptTool {
    pub fn new(interpreter: String, runner: ProcessRunner) -> Self {
        Self {
            interpreter,
            runner,
        }
    }

    pub async fn execute(&self, input: RunScriptInput) -> Result<ToolResult> {
        Self::validate_input(&input)?;
        debug!(
            "Running {} byte script with {}",
            input.code.len(),
            self.interpreter
        );

        let outcome = self
            .runner
            .run(&self.interpreter, ["-c", input.code.as_str()])
            .await;

        if !outcome.succeeded() {
            return Ok(ToolResult::failure(format!(
                "Script error: {}",
                outcome.failure_detail()
            )));
        }

        let text = [outcome.stdout.as_str(), outcome.stderr.as_str()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("(no output)");
        Ok(ToolResult::success(text))
    }

    fn validate_input(input: &RunScriptInput) -> Result<()> {
        if input.code.is_empty() {
            return Err(Error::missing_argument("code"));
        }
        Ok(())
    }
}

impl ToolHandler for RunScriptTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: RUN_SCRIPT,
            description: "Execute a script or expression with the container's interpreter",
            input_schema: input_schema::<RunScriptInput>(),
        }
    }

    fn call(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let input: RunScriptInput = parse_input(arguments)?;
            self.execute(input).await
        })
    }
}

// ============================================================================
// list_projects
// ============================================================================

/// Project listing tool handler
pub struct ListProjectsTool {
    projects_dir: PathBuf,
}

impl ListProjectsTool {
    pub fn new(projects_dir: PathBuf) -> Self {
        Self { projects_dir }
    }

    pub async fn execute(&self) -> ToolResult {
        match self.project_names().await {
            Ok(projects) if projects.is_empty() => ToolResult::success(format!(
                "No projects found in {}",
                self.projects_dir.display()
            )),
            Ok(projects) => {
                let lines: Vec<String> = projects.iter().map(|p| format!("  - {}", p)).collect();
                ToolResult::success(format!("Projects:\n{}", lines.join("\n")))
            }
            Err(e) => ToolResult::failure(format!(
                "Error listing projects: {}: {}",
                self.projects_dir.display(),
                e
            )),
        }
    }

    async fn project_names(&self) -> std::io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.projects_dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl ToolHandler for ListProjectsTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: LIST_PROJECTS,
            description: "List all projects in the workspace projects directory",
            input_schema: input_schema::<ListProjectsInput>(),
        }
    }

    fn call(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let _: ListProjectsInput = parse_input(arguments)?;
            Ok(self.execute().await)
        })
    }
}

// ============================================================================
// check_tool
// ============================================================================

/// Tool availability check handler
///
/// A missing tool is a normal answer, not a failure.
pub struct CheckToolTool {
    runner: ProcessRunner,
}

impl CheckToolTool {
    pub fn new(runner: ProcessRunner) -> Self {
        Self { runner }
    }

    pub async fn execute(&self, input: CheckToolInput) -> Result<ToolResult> {
        Self::validate_input(&input)?;
        let tool = input.tool.as_str();

        let Some(path) = resolve_on_path(tool) else {
            info!("Tool {} not found on PATH", tool);
            return Ok(ToolResult::success(format!(
                "✗ {} is not available in this container",
                tool
            )));
        };

        let outcome = self.runner.run(&path, ["--version"]).await;
        let version = first_line(&outcome.stdout)
            .or_else(|| first_line(&outcome.stderr))
            .unwrap_or("version unknown");

        Ok(ToolResult::success(format!(
            "✓ {} is available\n  Path: {}\n  Version: {}",
            tool,
            path.display(),
            version
        )))
    }

    fn validate_input(input: &CheckToolInput) -> Result<()> {
        let tool = input.tool.as_str();
        if tool.is_empty() {
            return Err(Error::missing_argument("tool"));
        }
        if tool.starts_with('-')
            || tool
                .chars()
                .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control())
        {
            return Err(Error::invalid_argument(
                "tool",
                "must be a bare command name",
            ));
        }
        Ok(())
    }
}

impl ToolHandler for CheckToolTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: CHECK_TOOL,
            description: "Check if a tool is available in the container",
            input_schema: input_schema::<CheckToolInput>(),
        }
    }

    fn call(&self, arguments: Map<String, Value>) -> BoxFuture<'_, Result<ToolResult>> {
        Box::pin(async move {
            let input: CheckToolInput = parse_input(arguments)?;
            self.execute(input).await
        })
    }
}
