use async_trait::async_trait;
use bqmcp_warehouse::WarehouseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Describes a tool's interface for MCP clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name (e.g., "execute-query", "list-tables")
    pub name: String,
    /// Human-readable description shown to the client
    pub description: String,
    /// JSON Schema describing the expected input
    pub input_schema: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Result content (plain text or serialized JSON)
    pub content: String,
    /// Whether this result represents an error
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }
}

/// Context passed to tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Base for relative file paths and directories
    pub working_directory: PathBuf,
}

impl ToolContext {
    pub fn new(working_directory: impl Into<PathBuf>) -> Self {
        Self {
            working_directory: working_directory.into(),
        }
    }

    /// Absolute paths pass through; relative ones are joined onto the
    /// working directory.
    pub fn resolve_path(&self, requested: &str) -> PathBuf {
        let path = Path::new(requested);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }
}

/// The primary extension point: all tools implement this trait.
///
/// Tools are object-safe, Send + Sync, and async. Arguments have already
/// been validated against [`ToolDefinition::input_schema`] when
/// `execute` is called through the registry.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's definition (name, description, JSON Schema).
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given JSON object input.
    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool is registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A required argument was absent or null.
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// An argument had the wrong JSON type.
    #[error("Invalid argument '{name}': expected {expected}")]
    InvalidArgument { name: String, expected: String },

    /// The warehouse call behind the tool failed.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// Any other failure while running the tool.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    /// Errors caused by the request itself rather than by running the tool.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            ToolError::UnknownTool(_)
                | ToolError::MissingArgument(_)
                | ToolError::InvalidArgument { .. }
        )
    }
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition_serialization() {
        let def = ToolDefinition {
            name: "list-tables".to_string(),
            description: "List all tables".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        };
        let json = serde_json::to_string(&def).unwrap();
        let roundtrip: ToolDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.name, "list-tables");
        assert_eq!(def.to_string(), "list-tables(List all tables)");
    }

    #[test]
    fn test_resolve_path() {
        let ctx = ToolContext::new("/srv/exports");
        assert_eq!(ctx.resolve_path("out.csv"), PathBuf::from("/srv/exports/out.csv"));
        assert_eq!(ctx.resolve_path("/tmp/out.csv"), PathBuf::from("/tmp/out.csv"));
    }

    #[test]
    fn test_error_classification() {
        assert!(ToolError::UnknownTool("x".into()).is_invalid_request());
        assert!(ToolError::MissingArgument("query".into()).is_invalid_request());
        assert!(ToolError::InvalidArgument {
            name: "query".into(),
            expected: "string".into()
        }
        .is_invalid_request());
        assert!(!ToolError::Warehouse(WarehouseError::NoResults).is_invalid_request());
        assert!(!ToolError::ExecutionFailed("boom".into()).is_invalid_request());
    }

    #[test]
    fn test_warehouse_error_message_is_transparent() {
        let err = ToolError::from(WarehouseError::NoResults);
        assert_eq!(
            err.to_string(),
            "No previous query results available. Execute a query first."
        );
    }
}
