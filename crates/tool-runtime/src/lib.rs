//! Tool contract and the BigQuery tool set.
//!
//! - **tool**: `Tool` trait, `ToolDefinition`, `ToolResult`, `ToolError`
//! - **schema**: argument validation against a tool's JSON Schema
//! - **registry**: name → tool table, invoked by the MCP layer
//! - **tools**: the six BigQuery tools

pub mod tool;
pub mod schema;
pub mod tools;
pub mod registry;

pub use tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};
pub use registry::{RegistryError, ToolRegistry};
pub use schema::validate_arguments;
pub use tools::{
    bigquery_registry, register_all, DescribeTableTool, ExecuteQueryTool, ListTablesTool,
    SaveCsvAutoTool, SaveCsvFileTool, SaveLastResultsCsvTool,
};
