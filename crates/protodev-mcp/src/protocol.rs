//! JSON-RPC 2.0 mapping for MCP messages
//!
//! Turns one decoded frame into at most one response frame. Notifications
//! (messages without an `id`) never produce a response.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::dispatcher::{Dispatcher, Request};
use crate::{Error, Result};

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "protodev";

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

/// Result of the `initialize` handshake
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "capabilities": {
            "tools": {},
            "resources": {}
        }
    })
}

pub fn success_response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "result": result })
}

pub fn error_response(id: Value, error: &Error) -> Value {
    json!({ "jsonrpc": JSONRPC_VERSION, "id": id, "error": error.to_json_rpc() })
}

/// Decode a dispatcher method and its params
pub fn decode_request(method: &str, params: Option<&Value>) -> Result<Request> {
    let params = params.cloned().unwrap_or_else(|| json!({}));
    match method {
        "resources/list" => Ok(Request::ListResources),
        "tools/list" => Ok(Request::ListTools),
        "resources/read" => {
            let p: ReadResourceParams = decode_params(params)?;
            Ok(Request::ReadResource { uri: p.uri })
        }
        "tools/call" => {
            let p: CallToolParams = decode_params(params)?;
            Ok(Request::CallTool {
                name: p.name,
                arguments: p.arguments.unwrap_or_default(),
            })
        }
        other => Err(Error::unknown_method(other)),
    }
}

fn decode_params<T: for<'de> Deserialize<'de>>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| Error::invalid_params(e.to_string()))
}

/// Handle one raw frame; malformed JSON yields a parse error response
pub async fn handle_line(dispatcher: &Dispatcher, line: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(line) {
        Ok(message) => handle_message(dispatcher, message).await,
        Err(e) => {
            warn!("Discarding malformed frame: {}", e);
            Some(error_response(Value::Null, &Error::parse_error(e.to_string())))
        }
    }
}

/// Handle one decoded JSON-RPC message
pub async fn handle_message(dispatcher: &Dispatcher, message: Value) -> Option<Value> {
    let Some(obj) = message.as_object() else {
        return Some(error_response(
            Value::Null,
            &Error::invalid_request("Message must be a JSON object"),
        ));
    };

    let id = obj.get("id").cloned();

    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Some(error_response(
            id.unwrap_or(Value::Null),
            &Error::invalid_request("Missing or invalid jsonrpc version"),
        ));
    }

    let Some(method) = obj.get("method").and_then(Value::as_str) else {
        if obj.contains_key("result") || obj.contains_key("error") {
            debug!("Ignoring client response frame");
            return None;
        }
        return Some(error_response(
            id.unwrap_or(Value::Null),
            &Error::invalid_request("Missing method"),
        ));
    };

    let Some(id) = id else {
        debug!(method, "Notification received");
        return None;
    };

    debug!(method, "Request received");
    let outcome = match method {
        "initialize" => Ok(initialize_result()),
        "ping" => Ok(json!({})),
        _ => match decode_request(method, obj.get("params")) {
            Ok(request) => dispatcher
                .handle(request)
                .await
                .map(|response| response.into_value()),
            Err(e) => Err(e),
        },
    };

    Some(match outcome {
        Ok(result) => success_response(id, result),
        Err(e) => {
            debug!(method, code = e.code.0, "Request failed: {}", e.message);
            error_response(id, &e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_decode_call_tool_defaults_arguments() {
        let request = decode_request("tools/call", Some(&json!({ "name": "list_projects" }))).unwrap();
        assert_eq!(
            request,
            Request::CallTool {
                name: "list_projects".into(),
                arguments: Map::new()
            }
        );

        let request = decode_request(
            "tools/call",
            Some(&json!({ "name": "check_tool", "arguments": null })),
        )
        .unwrap();
        assert!(matches!(request, Request::CallTool { arguments, .. } if arguments.is_empty()));
    }

    #[test]
    fn test_decode_missing_params_is_invalid_params() {
        let err = decode_request("resources/read", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let err = decode_request("tools/call", Some(&json!({ "arguments": {} }))).unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_decode_unknown_method() {
        let err = decode_request("prompts/get", None).unwrap_err();
        assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);
        assert_eq!(err.message, "Unknown method: prompts/get");
    }

    #[test]
    fn test_initialize_result_advertises_capabilities() {
        let result = initialize_result();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "protodev");
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }
}
