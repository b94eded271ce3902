//! MCP server implementation.
//!
//! Wraps a `ToolRegistry` and exposes its tools over the MCP protocol.
//! One `McpServer` serves one session; requests within a session are
//! handled one at a time.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use bqmcp_tool_runtime::{ToolContext, ToolRegistry};

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

/// Name reported in `initialize`.
pub const SERVER_NAME: &str = "bigquery-manager";

/// MCP server that bridges a `ToolRegistry` to MCP clients.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    server_name: String,
    server_version: String,
    initialized: bool,
    context: ToolContext,
}

impl McpServer {
    /// Create a new MCP server over the shared tool registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_name: SERVER_NAME.to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            initialized: false,
            context: ToolContext::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))),
        }
    }

    /// Set the working directory relative file paths resolve against.
    pub fn with_working_directory(mut self, dir: PathBuf) -> Self {
        self.context = ToolContext::new(dir);
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server loop, reading from and writing to the transport.
    ///
    /// Processes JSON-RPC messages until the transport is closed.
    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        tracing::debug!(server = %self.server_name, "MCP session loop starting");

        while let Some(line) = transport.receive().await? {
            tracing::debug!(message = %line, "Received message");

            if let Some(response) = self.handle_message(&line).await {
                let json = serde_json::to_string(&response)?;
                tracing::debug!(response = %json, "Sending response");
                transport.send(&json).await?;
            }
        }

        tracing::debug!("Transport closed, session loop ending");
        Ok(())
    }

    /// Handle one raw message. Notifications produce no response.
    pub async fn handle_message(&mut self, line: &str) -> Option<JsonRpcResponse> {
        // Requests carry an "id"; notifications don't.
        let raw: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON");
                return Some(error_response(RpcId::Null, &McpError::JsonParse(e)));
            }
        };

        if raw.get("id").is_none() {
            match serde_json::from_value::<JsonRpcNotification>(raw) {
                Ok(notif) => self.handle_notification(&notif),
                Err(e) => tracing::debug!(error = %e, "Ignoring malformed notification"),
            }
            return None;
        }

        let request: JsonRpcRequest = match serde_json::from_value(raw) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON-RPC request");
                return Some(JsonRpcResponse::error(
                    RpcId::Null,
                    error_codes::INVALID_REQUEST,
                    format!("Invalid request: {e}"),
                ));
            }
        };

        Some(self.handle_request(&request).await)
    }

    /// Handle a single JSON-RPC request and produce a response.
    pub async fn handle_request(&mut self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, &request.params),
            "ping" => JsonRpcResponse::success(id, Value::Object(Default::default())),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, &request.params).await,
            method => {
                tracing::warn!(method = %method, "Unknown method");
                error_response(id, &McpError::MethodNotFound(method.to_string()))
            }
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => {
                tracing::info!("Client confirmed initialization");
            }
            "notifications/cancelled" => {
                tracing::debug!("Client cancelled a request");
            }
            method => {
                tracing::debug!(method = %method, "Unknown notification, ignoring");
            }
        }
    }

    fn handle_initialize(&mut self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        let client = params
            .as_ref()
            .and_then(|p| serde_json::from_value::<InitializeParams>(p.clone()).ok());
        tracing::info!(
            client = client.as_ref().map(|c| c.client_info.name.as_str()).unwrap_or("unknown"),
            client_protocol = client.as_ref().map(|c| c.protocol_version.as_str()).unwrap_or("unknown"),
            "Handling initialize"
        );
        self.initialized = true;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        };

        to_response(id, result)
    }

    fn handle_list_tools(&self, id: RpcId) -> JsonRpcResponse {
        tracing::debug!("Handling tools/list");

        let tools: Vec<ToolInfo> = self.registry.list().into_iter().map(ToolInfo::from).collect();
        to_response(id, ListToolsResult { tools })
    }

    async fn handle_call_tool(&self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return error_response(id, &McpError::InvalidParams("missing params".to_string()));
        };

        let call: CallToolParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => return error_response(id, &McpError::InvalidParams(e.to_string())),
        };

        tracing::debug!(tool = %call.name, "Handling tools/call");

        let arguments = call.arguments.clone().unwrap_or(Value::Null);
        let result = match self.registry.invoke(&call.name, call.arguments, &self.context).await {
            Ok(tool_result) => CallToolResult::from(tool_result),
            Err(e) if e.is_invalid_request() => {
                tracing::warn!(
                    tool = %call.name,
                    arguments = %arguments,
                    error = %e,
                    "Rejected tool call"
                );
                return error_response(id, &McpError::Tool(e));
            }
            Err(e) => {
                tracing::error!(
                    tool = %call.name,
                    arguments = %arguments,
                    error = %e,
                    "Tool execution failed"
                );
                CallToolResult::text(format!("Error: {e}"), true)
            }
        };

        to_response(id, result)
    }
}

fn error_response(id: RpcId, err: &McpError) -> JsonRpcResponse {
    let rpc = err.to_rpc_error();
    JsonRpcResponse::error(id, rpc.code, rpc.message)
}

fn to_response<T: serde::Serialize>(id: RpcId, result: T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(val) => JsonRpcResponse::success(id, val),
        Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}
