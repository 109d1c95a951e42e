//! JSON-RPC 2.0 message types spoken with peers and with the outer caller.

use serde::{Deserialize, Serialize};

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;

/// JSON-RPC 2.0 request sent to a peer.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Distinct per request.
    pub id: u64,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// A request with the given id.
    pub fn new(id: u64, method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response received from a peer.
///
/// `error` stays raw JSON so it can be relayed exactly as the peer sent it.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version echoed by the peer.
    #[serde(default)]
    pub jsonrpc: String,
    /// Id of the request being answered.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Success payload.
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error object, as sent.
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// An error without `data`.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// A request or notification read from the outer caller.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// Protocol version sent by the caller.
    #[serde(default)]
    pub jsonrpc: String,
    /// Absent for notifications.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<serde_json::Value>,
}

/// A response written back to the outer caller.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingResponse {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Id of the request being answered, `null` for parse errors.
    pub id: serde_json::Value,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl OutgoingResponse {
    /// A response carrying `result`.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// A response carrying `error`.
    pub fn failure(id: serde_json::Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Tool definition from a peer's `tools/list` response.
///
/// Fields this gateway does not interpret are kept in `extra` so the
/// definition can be re-advertised unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct McpToolDef {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments.
    #[serde(default = "default_input_schema", rename = "inputSchema")]
    pub input_schema: serde_json::Value,
    /// Fields passed through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl McpToolDef {
    /// A tool with an object schema and no extra fields.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema,
            extra: serde_json::Map::new(),
        }
    }
}

fn default_input_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Tool call result from a `tools/call` response.
#[derive(Debug, Clone, Deserialize)]
pub struct McpToolResult {
    /// Content blocks.
    #[serde(default)]
    pub content: Vec<McpContent>,
    /// Set when the tool reported failure.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

/// Content block of a tool call result.
#[derive(Debug, Clone, Deserialize)]
pub struct McpContent {
    /// Block type, usually `text`.
    #[serde(default, rename = "type")]
    pub content_type: String,
    /// Text of a `text` block.
    #[serde(default)]
    pub text: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_request_serialization() {
        let req = JsonRpcRequest::new(
            7,
            "tools/call",
            Some(serde_json::json!({"name": "decompile", "arguments": {}})),
        );
        let parsed: serde_json::Value = serde_json::to_value(&req).unwrap();
        assert_eq!(parsed["jsonrpc"], "2.0");
        assert_eq!(parsed["id"], 7);
        assert_eq!(parsed["method"], "tools/call");
        assert_eq!(parsed["params"]["name"], "decompile");
    }

    #[test]
    fn test_json_rpc_request_no_params() {
        let req = JsonRpcRequest::new(2, "tools/list", None);
        let parsed: serde_json::Value = serde_json::to_value(&req).unwrap();
        assert!(parsed.get("params").is_none());
    }

    #[test]
    fn test_json_rpc_response_parse() {
        let json = r#"{"jsonrpc":"2.0","id":1,"result":{"tools":[]}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.id, Some(serde_json::json!(1)));
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_json_rpc_null_result_is_absent() {
        let resp: JsonRpcResponse = serde_json::from_str(r#"{"id":1,"result":null}"#).unwrap();
        assert!(resp.result.is_none());
    }

    #[test]
    fn test_json_rpc_error_kept_raw() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"not found"}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        let err = resp.error.unwrap();
        assert_eq!(err["code"], -32601);
        assert_eq!(err["message"], "not found");
    }

    #[test]
    fn test_tool_def_defaults_schema() {
        let tool: McpToolDef = serde_json::from_str(r#"{"name":"idb_meta"}"#).unwrap();
        assert_eq!(tool.name, "idb_meta");
        assert!(tool.description.is_none());
        assert_eq!(tool.input_schema["type"], "object");
    }

    #[test]
    fn test_tool_def_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "name": "rename",
            "description": "Rename a symbol",
            "inputSchema": {"type": "object", "properties": {"addr": {"type": "string"}}},
            "annotations": {"destructiveHint": true},
        });
        let tool: McpToolDef = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(tool.extra["annotations"]["destructiveHint"], true);
        assert_eq!(serde_json::to_value(&tool).unwrap(), raw);
    }

    #[test]
    fn test_tool_result_content_without_type() {
        let json = r#"{"content":[{"text":"{\"filename\":\"sample.idb\"}"}]}"#;
        let result: McpToolResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content[0].content_type, "");
        assert_eq!(
            result.content[0].text.as_deref(),
            Some(r#"{"filename":"sample.idb"}"#)
        );
    }

    #[test]
    fn test_incoming_notification_has_no_id() {
        let msg: IncomingMessage =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
                .unwrap();
        assert!(msg.id.is_none());
        assert!(msg.params.is_none());
    }

    #[test]
    fn test_outgoing_failure_omits_result() {
        let resp = OutgoingResponse::failure(
            serde_json::json!("req-1"),
            JsonRpcError::new(METHOD_NOT_FOUND, "Method not found: foo"),
        );
        let parsed = serde_json::to_value(&resp).unwrap();
        assert!(parsed.get("result").is_none());
        assert_eq!(parsed["id"], "req-1");
        assert_eq!(parsed["error"]["code"], -32601);
        assert!(parsed["error"].get("data").is_none());
    }
}
