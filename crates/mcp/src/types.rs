//! JSON-RPC 2.0 and MCP protocol types.
//!
//! Wire format for the Model Context Protocol (MCP): JSON-RPC 2.0 messages
//! carried over the HTTP+SSE transport.

use bqmcp_tool_runtime::{ToolDefinition, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── JSON-RPC 2.0 Base Types ─────────────────────────────────────────

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RpcId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 response message (success or error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RpcId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// JSON-RPC request ID: a number or a string. `Null` is only used when
/// answering a message whose id could not be read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RpcId {
    Number(i64),
    String(String),
    Null,
}

// ── Standard JSON-RPC error codes ───────────────────────────────────

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

// ── MCP Initialize ──────────────────────────────────────────────────

/// Parameters for the `initialize` MCP method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    pub client_info: ClientInfo,
}

/// Client capabilities advertised during initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Value>,
}

/// Information about the connecting client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Result returned from the `initialize` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Server capabilities advertised during initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

/// Information about the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ── MCP tools/list ──────────────────────────────────────────────────

/// Result of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolInfo>,
}

/// Describes a single tool in MCP format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<ToolDefinition> for ToolInfo {
    fn from(def: ToolDefinition) -> Self {
        Self {
            name: def.name,
            description: def.description,
            input_schema: def.input_schema,
        }
    }
}

// ── MCP tools/call ──────────────────────────────────────────────────

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// Content block within a tool call result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

impl CallToolResult {
    /// A single text block.
    pub fn text(text: impl Into<String>, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error,
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

impl From<ToolResult> for CallToolResult {
    fn from(result: ToolResult) -> Self {
        Self::text(result.content, result.is_error)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(id: RpcId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: RpcId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: RpcId, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC 2.0 notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
        }
    }
}

// ── MCP Protocol version ────────────────────────────────────────────

/// The MCP protocol version this crate implements.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jsonrpc_request_roundtrip() {
        let req = JsonRpcRequest::new(
            RpcId::Number(1),
            "tools/call",
            Some(serde_json::json!({"name": "execute-query", "arguments": {"query": "SELECT 1"}})),
        );
        let json = serde_json::to_string(&req).unwrap();
        let parsed: JsonRpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.method, "tools/call");
        assert_eq!(parsed.id, RpcId::Number(1));
        let params: CallToolParams = serde_json::from_value(parsed.params.unwrap()).unwrap();
        assert_eq!(params.arguments.unwrap()["query"], "SELECT 1");
        assert_eq!(parsed.jsonrpc, "2.0");
    }

    #[test]
    fn test_jsonrpc_response_success_roundtrip() {
        let resp = JsonRpcResponse::success(
            RpcId::String("abc".to_string()),
            serde_json::json!({}),
        );
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: JsonRpcResponse = serde_json::from_str(&json).unwrap();
        assert!(parsed.result.is_some());
        assert!(parsed.error.is_none());
        assert_eq!(parsed.id, RpcId::String("abc".to_string()));
    }

    #[test]
    fn test_jsonrpc_response_error_roundtrip() {
        let resp = JsonRpcResponse::error(
            RpcId::Number(2),
            error_codes::METHOD_NOT_FOUND,
            "Method not found",
        );
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: JsonRpcResponse = serde_json::from_str(&json).unwrap();
        assert!(parsed.result.is_none());
        assert!(parsed.error.is_some());
        let err = parsed.error.unwrap();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
        assert_eq!(err.message, "Method not found");
    }

    #[test]
    fn test_jsonrpc_notification_roundtrip() {
        let notif = JsonRpcNotification::new(
            "notifications/initialized",
            None,
        );
        let json = serde_json::to_string(&notif).unwrap();
        let parsed: JsonRpcNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.method, "notifications/initialized");
        assert!(parsed.params.is_none());
    }

    #[test]
    fn test_rpc_id_number() {
        let id = RpcId::Number(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let parsed: RpcId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RpcId::Number(42));
    }

    #[test]
    fn test_rpc_id_string() {
        let id = RpcId::String("req-1".to_string());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"req-1\"");
        let parsed: RpcId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, RpcId::String("req-1".to_string()));
    }

    #[test]
    fn test_tool_info_from_tool_definition() {
        let def = ToolDefinition {
            name: "describe-table".to_string(),
            description: "Get the schema information for a specific table".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        };
        let info: ToolInfo = def.into();
        assert_eq!(info.name, "describe-table");
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("inputSchema").is_some());
    }

    #[test]
    fn test_rpc_id_null() {
        let resp = JsonRpcResponse::error(RpcId::Null, error_codes::PARSE_ERROR, "bad json");
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["id"].is_null());
        let parsed: JsonRpcResponse = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.id, RpcId::Null);
    }

    #[test]
    fn test_call_tool_params_without_arguments() {
        let params: CallToolParams =
            serde_json::from_value(serde_json::json!({"name": "list-tables"})).unwrap();
        assert_eq!(params.name, "list-tables");
        assert!(params.arguments.is_none());
    }

    #[test]
    fn test_call_tool_result_from_tool_result() {
        let result = CallToolResult::from(ToolResult::text("[]"));
        assert_eq!(result.first_text(), Some("[]"));
        assert!(!result.is_error);

        let json = serde_json::to_value(CallToolResult::text("Error: boom", true)).unwrap();
        assert_eq!(json["isError"], true);
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "Error: boom");
    }

    #[test]
    fn test_initialize_result_roundtrip() {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "bigquery-manager".to_string(),
                version: Some("0.1.0".to_string()),
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        let parsed: InitializeResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.protocol_version, PROTOCOL_VERSION);
        assert_eq!(parsed.server_info.name, "bigquery-manager");
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["protocolVersion"], "2024-11-05");
        assert_eq!(json["capabilities"]["tools"]["listChanged"], false);
    }

    #[test]
    fn test_call_tool_result_roundtrip() {
        let result = CallToolResult {
            content: vec![ToolContent::Text {
                text: "hello".to_string(),
            }],
            is_error: false,
        };
        let json = serde_json::to_string(&result).unwrap();
        let parsed: CallToolResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.content.len(), 1);
        assert!(!parsed.is_error);
        assert!(!json.contains("isError"));
    }

    #[test]
    fn test_call_tool_result_with_error() {
        let result = CallToolResult {
            content: vec![ToolContent::Text {
                text: "something went wrong".to_string(),
            }],
            is_error: true,
        };
        let json = serde_json::to_string(&result).unwrap();
        let parsed: CallToolResult = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_error);
    }

    #[test]
    fn test_list_tools_result_roundtrip() {
        let result = ListToolsResult {
            tools: vec![
                ToolInfo {
                    name: "list-tables".to_string(),
                    description: "List all tables in the BigQuery database".to_string(),
                    input_schema: serde_json::json!({"type": "object"}),
                },
            ],
        };
        let json = serde_json::to_string(&result).unwrap();
        let parsed: ListToolsResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.tools.len(), 1);
        assert_eq!(parsed.tools[0].name, "list-tables");
    }
}
