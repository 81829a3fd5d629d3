//! Protocol-level error type for the MCP server
//!
//! Only caller misuse is an `Error`: an unknown resource URI, an unknown tool
//! or method, or arguments that do not satisfy a tool's schema. Failures of a
//! valid request (a subprocess exiting non-zero, an unreadable directory) are
//! reported inside a successful [`crate::types::ToolResult`] instead.

use rmcp::model::ErrorCode;
use serde_json::{json, Value};
use thiserror::Error;

/// Result type for MCP operations
pub type Result<T> = std::result::Result<T, Error>;

/// MCP protocol error carrying a JSON-RPC error code
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct Error {
    /// JSON-RPC error code (e.g., -32601 method not found)
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Additional error context, sent as the JSON-RPC `data` member
    pub context: Option<Value>,
}

impl Error {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    /// Add context information as JSON
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Resource URI not served by this server
    pub fn unknown_resource(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self::new(
            ErrorCode::INVALID_REQUEST,
            format!("Unknown resource: {}", uri),
        )
        .with_context(json!({ "uri": uri }))
    }

    /// Tool name not present in the registry
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(ErrorCode::METHOD_NOT_FOUND, format!("Unknown tool: {}", name))
            .with_context(json!({ "tool": name }))
    }

    /// JSON-RPC method the server does not implement
    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::METHOD_NOT_FOUND,
            format!("Unknown method: {}", method.into()),
        )
    }

    /// Required argument absent, null or empty
    pub fn missing_argument(param: impl Into<String>) -> Self {
        let p = param.into();
        Self::new(
            ErrorCode::INVALID_PARAMS,
            format!("Missing required argument: {}", p),
        )
        .with_context(json!({ "parameter": p }))
    }

    /// Argument present but unusable
    pub fn invalid_argument(param: impl Into<String>, reason: impl Into<String>) -> Self {
        let p = param.into();
        let reason = reason.into();
        Self::new(
            ErrorCode::INVALID_PARAMS,
            format!("Invalid argument '{}': {}", p, reason),
        )
        .with_context(json!({
            "parameter": p,
            "reason": reason
        }))
    }

    /// Params that could not be decoded at all
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::INVALID_PARAMS,
            format!("Invalid params: {}", reason.into()),
        )
    }

    /// Structurally invalid JSON-RPC message
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::INVALID_REQUEST, reason)
    }

    /// Frame that is not valid JSON
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::PARSE_ERROR, format!("Parse error: {}", reason.into()))
    }

    /// Internal server error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::INTERNAL_ERROR,
            format!("Internal server error: {}", reason.into()),
        )
    }

    /// Render as a JSON-RPC 2.0 error object
    pub fn to_json_rpc(&self) -> Value {
        let mut error = json!({
            "code": self.code.0,
            "message": self.message,
        });
        if let Some(context) = &self.context {
            error["data"] = context.clone();
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_is_method_not_found() {
        let err = Error::unknown_tool("nope");
        assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);
        assert_eq!(err.message, "Unknown tool: nope");
        assert_eq!(err.context.unwrap()["tool"], "nope");
    }

    #[test]
    fn test_unknown_resource_is_invalid_request() {
        let err = Error::unknown_resource("bogus://x");
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert!(err.message.contains("bogus://x"));
    }

    #[test]
    fn test_missing_argument_names_parameter() {
        let err = Error::missing_argument("code");
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(err.to_string(), "Missing required argument: code");
    }

    #[test]
    fn test_json_rpc_rendering() {
        let rendered = Error::invalid_argument("all", "expected boolean").to_json_rpc();
        assert_eq!(rendered["code"], -32602);
        assert_eq!(rendered["message"], "Invalid argument 'all': expected boolean");
        assert_eq!(rendered["data"]["parameter"], "all");

        let bare = Error::unknown_method("foo/bar").to_json_rpc();
        assert_eq!(bare["code"], -32601);
        assert!(bare.get("data").is_none());
    }
}
