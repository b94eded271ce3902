//! The BigQuery tools exposed over MCP.
//!
//! Each tool wraps exactly one [`BigQueryDatabase`] operation and renders
//! its result as text: JSON for data, a confirmation sentence for exports.

pub mod describe_table;
pub mod execute_query;
pub mod list_tables;
pub mod save_csv_auto;
pub mod save_csv_file;
pub mod save_last_results_csv;

use std::sync::Arc;

use bqmcp_warehouse::BigQueryDatabase;

use crate::registry::{RegistryError, ToolRegistry};

pub use describe_table::DescribeTableTool;
pub use execute_query::ExecuteQueryTool;
pub use list_tables::ListTablesTool;
pub use save_csv_auto::SaveCsvAutoTool;
pub use save_csv_file::SaveCsvFileTool;
pub use save_last_results_csv::SaveLastResultsCsvTool;

/// Register all six BigQuery tools against `db`.
pub fn register_all(registry: &mut ToolRegistry, db: Arc<BigQueryDatabase>) -> Result<(), RegistryError> {
    registry.register(ExecuteQueryTool::new(db.clone()))?;
    registry.register(ListTablesTool::new(db.clone()))?;
    registry.register(DescribeTableTool::new(db.clone()))?;
    registry.register(SaveCsvFileTool::new(db.clone()))?;
    registry.register(SaveLastResultsCsvTool::new(db.clone()))?;
    registry.register(SaveCsvAutoTool::new(db))?;
    Ok(())
}

/// Registry pre-loaded with every BigQuery tool.
pub fn bigquery_registry(db: Arc<BigQueryDatabase>) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    register_all(&mut registry, db)?;
    Ok(registry)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use bqmcp_warehouse::testing::InMemoryWarehouse;
    use bqmcp_warehouse::{BigQueryDatabase, CellValue, QueryResult, Record, SchemaField};

    pub fn select_one() -> QueryResult {
        let mut row = Record::new();
        row.insert("x".into(), CellValue::Integer(1));
        QueryResult::new(vec![SchemaField::new("x", "INTEGER")], vec![row])
    }

    pub fn db() -> Arc<BigQueryDatabase> {
        let warehouse = InMemoryWarehouse::new("proj")
            .with_table(
                "sales",
                "orders",
                vec![SchemaField::new("id", "INTEGER").with_mode("REQUIRED")],
                Some("CREATE TABLE `proj.sales.orders` (id INT64 NOT NULL)"),
            )
            .with_table("hr", "people", vec![SchemaField::new("name", "STRING")], None)
            .with_query("SELECT 1 AS x", select_one())
            .with_query("SELECT @x AS x", select_one())
            .with_failing_query("SELEC 1", "Syntax error: Unexpected identifier \"SELEC\"");
        Arc::new(BigQueryDatabase::new(Arc::new(warehouse)))
    }
}
