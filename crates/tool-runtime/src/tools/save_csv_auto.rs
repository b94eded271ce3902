//! `save-csv-auto`: run a query and write it to a timestamped file.

use std::sync::Arc;

use async_trait::async_trait;
use bqmcp_warehouse::BigQueryDatabase;
use serde_json::Value;

use crate::schema::{optional_str, required_str};
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

pub struct SaveCsvAutoTool {
    db: Arc<BigQueryDatabase>,
}

impl SaveCsvAutoTool {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for SaveCsvAutoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "save-csv-auto".to_string(),
            description: "Execute a SELECT query and save results to an auto-generated CSV file with timestamp".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SELECT SQL query to execute and save as CSV"
                    },
                    "directory": {
                        "type": "string",
                        "description": "Directory where to save the CSV file (default: current directory)"
                    },
                    "base_name": {
                        "type": "string",
                        "description": "Base name for the CSV file (default: 'bigquery_export')"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = required_str(&input, "query")?;
        let base_name = optional_str(&input, "base_name");
        let directory = context.resolve_path(optional_str(&input, "directory").unwrap_or("."));

        let export = self
            .db
            .save_csv_auto(query, base_name, Some(directory.as_path()))
            .await?;
        Ok(ToolResult::text(export.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fixtures;
    use serde_json::json;

    #[tokio::test]
    async fn generates_name_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SaveCsvAutoTool::new(fixtures::db());

        let result = tool
            .execute(
                json!({"query": "SELECT 1 AS x", "directory": "exports", "base_name": "daily"}),
                &ToolContext::new(dir.path()),
            )
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path().join("exports"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("daily_"), "{}", files[0]);
        assert!(files[0].ends_with(".csv"));
        assert!(result.content.contains(&files[0]));
    }

    #[tokio::test]
    async fn defaults_to_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tool = SaveCsvAutoTool::new(fixtures::db());

        tool.execute(json!({"query": "SELECT 1 AS x"}), &ToolContext::new(dir.path()))
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("bigquery_export_"));
    }
}
