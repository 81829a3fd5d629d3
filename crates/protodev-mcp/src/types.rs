//! Type definitions for MCP descriptors, envelopes and tool inputs
//!
//! Tool input structs derive `JsonSchema`; the generated schema is both
//! advertised in `tools/list` and used to validate incoming arguments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Descriptor for a tool exposed by the server
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Descriptor for a resource exposed by the server
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: &'static str,
    pub name: &'static str,
    pub mime_type: &'static str,
    pub description: &'static str,
}

// ============================================================================
// ENVELOPES
// ============================================================================

/// One block of tool output
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
        }
    }
}

/// Outcome of a tool call
///
/// `is_error` marks an operational failure of a valid request; protocol
/// misuse is reported through [`crate::Error`] instead.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<Content>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: true,
        }
    }

    /// Concatenated text of all content blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(Content::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Body of a resource read
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContent {
    pub uri: String,
    pub mime_type: &'static str,
    pub text: String,
}

// ============================================================================
// TOOL INPUTS
// ============================================================================

/// Input for the container_list tool
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ContainerListInput {
    /// Show all containers (default shows just running)
    #[serde(default)]
    pub all: bool,
}

/// Input for the run_script tool
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RunScriptInput {
    /// Script source passed to the interpreter's -c flag
    pub code: String,
}

/// Input for the list_projects tool
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListProjectsInput {}

/// Input for the check_tool tool
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CheckToolInput {
    /// Name of the tool to check (e.g., docker, python3, node)
    pub tool: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_result_omits_is_error() {
        let value = serde_json::to_value(ToolResult::success("ok")).unwrap();
        assert_eq!(value, json!({ "content": [{ "type": "text", "text": "ok" }] }));
    }

    #[test]
    fn test_failure_result_serialization() {
        let value = serde_json::to_value(ToolResult::failure("Error: boom")).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "Error: boom");
    }

    #[test]
    fn test_resource_descriptor_uses_camel_case() {
        let descriptor = ResourceDescriptor {
            uri: "container://info",
            name: "Container Information",
            mime_type: "application/json",
            description: "test",
        };
        let value = serde_json::to_value(descriptor).unwrap();
        assert_eq!(value["mimeType"], "application/json");
    }

    #[test]
    fn test_container_list_input_defaults() {
        let input: ContainerListInput = serde_json::from_value(json!({})).unwrap();
        assert!(!input.all);
    }

    #[test]
    fn test_run_script_schema_requires_code() {
        let schema = serde_json::to_value(schemars::schema_for!(RunScriptInput)).unwrap();
        assert_eq!(schema["required"], json!(["code"]));
        assert_eq!(schema["properties"]["code"]["type"], "string");
    }
}
