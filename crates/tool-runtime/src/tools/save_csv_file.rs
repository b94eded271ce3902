//! `save-csv-file`: run a query and write it to a chosen path.

use std::sync::Arc;

use async_trait::async_trait;
use bqmcp_warehouse::BigQueryDatabase;
use serde_json::Value;

use crate::schema::required_str;
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

pub struct SaveCsvFileTool {
    db: Arc<BigQueryDatabase>,
}

impl SaveCsvFileTool {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for SaveCsvFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "save-csv-file".to_string(),
            description: "Execute a SELECT query and save results to a CSV file".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SELECT SQL query to execute and save as CSV"
                    },
                    "file_path": {
                        "type": "string",
                        "description": "Path where to save the CSV file (e.g., /path/to/data.csv)"
                    }
                },
                "required": ["query", "file_path"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = required_str(&input, "query")?;
        let path = context.resolve_path(required_str(&input, "file_path")?);

        let export = self.db.save_query_to_csv_file(query, &path).await?;
        Ok(ToolResult::text(export.to_string()))
    }
}
