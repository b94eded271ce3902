//! `list-tables`: enumerate `dataset.table` names.

use std::sync::Arc;

use async_trait::async_trait;
use bqmcp_warehouse::BigQueryDatabase;
use serde_json::Value;

use crate::schema::optional_str;
use crate::tool::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};

pub struct ListTablesTool {
    db: Arc<BigQueryDatabase>,
}

impl ListTablesTool {
    pub fn new(db: Arc<BigQueryDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list-tables".to_string(),
            description: "List all tables in the BigQuery database".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "datasets_filter": {
                        "type": "string",
                        "description": "Optional filter for datasets (e.g., 'my_dataset')"
                    }
                }
            }),
        }
    }

    async fn execute(&self, input: Value, _context: &ToolContext) -> Result<ToolResult, ToolError> {
        let filter = optional_str(&input, "datasets_filter");
        let tables = self.db.list_tables(filter).await?;

        let body = serde_json::to_string(&tables)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
        Ok(ToolResult::text(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fixtures;
    use bqmcp_warehouse::WarehouseError;
    use serde_json::json;

    #[tokio::test]
    async fn lists_all_or_filtered() {
        let tool = ListTablesTool::new(fixtures::db());
        let ctx = ToolContext::new("/tmp");

        let all = tool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(all.content, r#"["sales.orders","hr.people"]"#);

        let hr = tool
            .execute(json!({"datasets_filter": "hr"}), &ctx)
            .await
            .unwrap();
        assert_eq!(hr.content, r#"["hr.people"]"#);
    }

    #[tokio::test]
    async fn unknown_dataset_fails() {
        let tool = ListTablesTool::new(fixtures::db());
        let err = tool
            .execute(json!({"datasets_filter": "ghost"}), &ToolContext::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Warehouse(WarehouseError::DatasetNotFound(_))
        ));
    }
}
