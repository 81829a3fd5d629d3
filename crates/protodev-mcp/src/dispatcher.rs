//! Request routing and the per-call failure boundary
//!
//! The dispatcher is transport-agnostic: it maps a decoded [`Request`] to a
//! [`Response`] or a protocol-level [`Error`]. Every request returns exactly
//! once; a handler that panics is reported as an `isError` tool result so a
//! single bad call never ends the session.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::resources::ResourceRegistry;
use crate::tools::{validate_arguments, ToolRegistry};
use crate::types::{ResourceContent, ResourceDescriptor, ToolDescriptor, ToolResult};
use crate::{Error, Result};

/// A decoded request, independent of wire framing
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ListResources,
    ReadResource {
        uri: String,
    },
    ListTools,
    CallTool {
        name: String,
        arguments: Map<String, Value>,
    },
}

/// Successful outcome of a request
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Resources(Vec<ResourceDescriptor>),
    ResourceContents(Vec<ResourceContent>),
    Tools(Vec<ToolDescriptor>),
    ToolResult(ToolResult),
}

impl Response {
    /// JSON body of the corresponding protocol result
    pub fn into_value(self) -> Value {
        match self {
            Response::Resources(resources) => json!({ "resources": resources }),
            Response::ResourceContents(contents) => json!({ "contents": contents }),
            Response::Tools(tools) => json!({ "tools": tools }),
            Response::ToolResult(result) => json!(result),
        }
    }
}

/// Routes requests to the tool and resource registries
pub struct Dispatcher {
    tools: ToolRegistry,
    resources: ResourceRegistry,
}

impl Dispatcher {
    pub fn new(tools: ToolRegistry, resources: ResourceRegistry) -> Self {
        Self { tools, resources }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Handle one request to completion
    pub async fn handle(&self, request: Request) -> Result<Response> {
        match request {
            Request::ListResources => Ok(Response::Resources(self.resources.descriptors())),
            Request::ListTools => Ok(Response::Tools(self.tools.descriptors())),
            Request::ReadResource { uri } => {
                self.read_resource(uri).await.map(Response::ResourceContents)
            }
            Request::CallTool { name, arguments } => self
                .call_tool(&name, arguments)
                .await
                .map(Response::ToolResult),
        }
    }

    /// Read a resource and wrap its JSON payload as text content
    pub async fn read_resource(&self, uri: String) -> Result<Vec<ResourceContent>> {
        let handler = self
            .resources
            .get(&uri)
            .ok_or_else(|| Error::unknown_resource(&uri))?;
        let descriptor = handler.descriptor();

        debug!("Reading resource {}", uri);
        let payload = handler.read().await?;
        let text =
            serde_json::to_string_pretty(&payload).map_err(|e| Error::internal(e.to_string()))?;

        Ok(vec![ResourceContent {
            uri,
            mime_type: descriptor.mime_type,
            text,
        }])
    }

    /// Validate arguments and invoke a tool inside the failure boundary
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolResult> {
        let (descriptor, handler) = self
            .tools
            .get(name)
            .ok_or_else(|| Error::unknown_tool(name))?;
        validate_arguments(&descriptor.input_schema, &arguments)?;

        info!(tool = name, "Calling tool");
        let result = match AssertUnwindSafe(handler.call(arguments))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool = name, "Tool handler panicked: {}", message);
                return Ok(ToolResult::failure(format!("Error: {}", message)));
            }
        };

        if let Ok(r) = &result {
            if r.is_error {
                info!(tool = name, "Tool reported an operational failure");
            }
        }
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool handler panicked".to_string()
    }
}
