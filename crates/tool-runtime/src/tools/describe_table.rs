//! `describe-table`: schema fields and DDL of one table.

use std::sync::Arc;

use async_trait::async_trait;
use bqmcp_warehouse::BigQueryDatabase;
use serde_json::Value;

use crate::schema::required_str;
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

pub struct DescribeTableTool {
    db: Arc<BigQueryDatabase>,
}

impl DescribeTableTool {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for DescribeTableTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "describe-table".to_string(),
            description: "Get the schema information for a specific table".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "table_name": {
                        "type": "string",
                        "description": "Name of the table to describe (e.g. my_dataset.my_table)"
                    }
                },
                "required": ["table_name"]
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let table_name = required_str(&input, "table_name")?;
        let description = self.db.describe_table(table_name).await?;

        let body = serde_json::to_string(&description)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolResult::text(body))
    }
}
