//! `save-last-results-csv`: export the cached result without re-running it.

use std::sync::Arc;

use async_trait::async_trait;
use bqmcp_warehouse::BigQueryDatabase;
use serde_json::Value;

use crate::schema::required_str;
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

pub struct SaveLastResultsCsvTool {
    db: Arc<BigQueryDatabase>,
}

impl SaveLastResultsCsvTool {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for SaveLastResultsCsvTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "save-last-results-csv".to_string(),
            description:
                "Save the last query results to a CSV file without re-running the query"
                    .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path where to save the CSV file (e.g., /path/to/data.csv)"
                    }
                },
                "required": ["file_path"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let path = context.resolve_path(required_str(&input, "file_path")?);
        let export = self.db.save_last_results_to_csv_file(&path).await?;
        Ok(ToolResult::text(export.to_string()))
    }
}
