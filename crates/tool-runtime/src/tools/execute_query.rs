//! `execute-query`: run SQL and return the rows as JSON.

use std::sync::Arc;

use async_trait::async_trait;
use bqmcp_warehouse::BigQueryDatabase;
use serde_json::Value;
use tracing::debug;

use crate::schema::required_str;
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

/// Execute a query and return a JSON array of row objects.
///
/// The result also becomes the database's last result.
pub struct ExecuteQueryTool {
    db: Arc<BigQueryDatabase>,
}

impl ExecuteQueryTool {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ExecuteQueryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "execute-query".to_string(),
            description: "Execute a SELECT query on the BigQuery database".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SELECT SQL query to execute using BigQuery dialect"
                    },
                    "params": {
                        "type": "object",
                        "description": "Optional named query parameters, referenced as @name in the query"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = required_str(&input, "query")?;
        let params = input.get("params").and_then(Value::as_object);

        let result = self.db.execute_query(query, params).await?;
        debug!(rows = result.row_count(), "execute-query finished");

        let body = serde_json::to_string(&result.rows)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolResult::text(body))
    }
}
