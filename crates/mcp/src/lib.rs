//! MCP (Model Context Protocol) server for the BigQuery tools.
//!
//! Implements MCP over JSON-RPC 2.0 for the HTTP+SSE transport.
//!
//! # Architecture
//!
//! - **types**: JSON-RPC 2.0 and MCP-specific protocol types
//! - **transport**: `McpTransport` trait, SSE session transport, in-memory pair
//! - **server**: MCP server dispatching to a `ToolRegistry`
//! - **error**: Unified error types
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use bqmcp_mcp::server::McpServer;
//! use bqmcp_mcp::transport::session_channel;
//! use bqmcp_tool_runtime::ToolRegistry;
//!
//! # async fn example() {
//! let registry = Arc::new(ToolRegistry::new());
//! let (mut transport, _handle) = session_channel(32);
//! let mut server = McpServer::new(registry);
//! server.run(&mut transport).await.unwrap();
//! # }
//! ```

pub mod types;
pub mod transport;
pub mod server;
pub mod error;

pub use types::*;
pub use transport::{
    session_channel, ChannelTransport, McpTransport, SessionHandle, SessionTransport, SseFrame,
};
pub use server::{McpServer, SERVER_NAME};
pub use error::McpError;
