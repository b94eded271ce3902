//! `BigQueryDatabase`: the data-access facade used by every tool.
//!
//! Owns the [`Warehouse`] handle and the last-result cache. The cache holds
//! the result of the most recent *successful* [`BigQueryDatabase::execute_query`]
//! and is shared by all sessions of the process.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::client::{BigQueryClient, Warehouse};
use crate::config::WarehouseConfig;
use crate::convert::QueryParameter;
use crate::csv_export::{self, csv_filename, CsvExport, DEFAULT_BASE_NAME};
use crate::error::WarehouseError;
use crate::result::{QueryResult, TableDescription, TableDescriptor};

pub struct BigQueryDatabase {
    warehouse: Arc<dyn Warehouse>,
    last_result: Mutex<Option<Arc<QueryResult>>>,
}

impl BigQueryDatabase {
    /// Wrap an existing [`Warehouse`] implementation.
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self {
            warehouse,
            last_result: Mutex::new(None),
        }
    }

    /// Validate `config`, resolve credentials and open a REST client.
    pub async fn connect(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        let client = BigQueryClient::connect(config).await?;
        Ok(Self::new(Arc::new(client)))
    }

    pub fn project(&self) -> &str {
        self.warehouse.project()
    }

    // ── Cache ────────────────────────────────────────────────────

    /// Result of the most recent successful query, if any.
    pub fn last_result(&self) -> Option<Arc<QueryResult>> {
        self.last_result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_last_result(&self, result: Arc<QueryResult>) {
        *self
            .last_result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(result);
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Run `query` with optional named parameters and cache the result.
    ///
    /// A failed query leaves the cache untouched.
    pub async fn execute_query(
        &self,
        query: &str,
        params: Option<&Map<String, Value>>,
    ) -> Result<Arc<QueryResult>, WarehouseError> {
        let params = params.map(QueryParameter::from_map).unwrap_or_default();
        debug!(query = %query, params = params.len(), "Executing query");

        let result = Arc::new(self.warehouse.run_query(query, &params).await?);
        self.store_last_result(Arc::clone(&result));

        debug!(rows = result.row_count(), "Query returned rows");
        Ok(result)
    }

    /// Tables of every dataset, or only of `datasets_filter` when given.
    pub async fn list_tables(
        &self,
        datasets_filter: Option<&str>,
    ) -> Result<Vec<TableDescriptor>, WarehouseError> {
        let datasets = match datasets_filter.map(str::trim).filter(|d| !d.is_empty()) {
            Some(dataset) => vec![dataset.to_string()],
            None => self.warehouse.list_datasets().await?,
        };

        let mut tables = Vec::new();
        for dataset in &datasets {
            let names = self.warehouse.list_tables(dataset).await?;
            tables.extend(names.into_iter().map(|t| TableDescriptor::new(dataset, t)));
        }

        info!(
            datasets = datasets.len(),
            tables = tables.len(),
            "Listed tables"
        );
        Ok(tables)
    }

    /// Column metadata and DDL of `dataset.table`.
    pub async fn describe_table(&self, table_name: &str) -> Result<TableDescription, WarehouseError> {
        let table = TableDescriptor::parse(table_name)?;
        let fields = self.warehouse.table_schema(&table).await?;
        let ddl = self.warehouse.table_ddl(&table).await?;

        debug!(table = %table, fields = fields.len(), has_ddl = ddl.is_some(), "Described table");
        Ok(TableDescription { table, fields, ddl })
    }

    // ── CSV exports ──────────────────────────────────────────────

    /// Run `query` (refreshing the cache) and write the result to `file_path`.
    pub async fn save_query_to_csv_file(
        &self,
        query: &str,
        file_path: &Path,
    ) -> Result<CsvExport, WarehouseError> {
        let result = self.execute_query(query, None).await?;
        csv_export::write_csv(result, file_path.to_path_buf()).await
    }

    /// Write the cached result to `file_path`.
    pub async fn save_last_results_to_csv_file(
        &self,
        file_path: &Path,
    ) -> Result<CsvExport, WarehouseError> {
        let Some(result) = self.last_result() else {
            warn!(path = %file_path.display(), "No cached result to export");
            return Err(WarehouseError::NoResults);
        };
        csv_export::write_csv(result, file_path.to_path_buf()).await
    }

    /// Run `query` and write it to a timestamped file in `directory`.
    ///
    /// Defaults: base name `bigquery_export`, directory `.`.
    pub async fn save_csv_auto(
        &self,
        query: &str,
        base_name: Option<&str>,
        directory: Option<&Path>,
    ) -> Result<CsvExport, WarehouseError> {
        let base_name = base_name
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BASE_NAME);
        let directory = directory
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let path = directory.join(csv_filename(base_name, Local::now()));

        self.save_query_to_csv_file(query, &path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{CellValue, Record, SchemaField};
    use crate::testing::InMemoryWarehouse;

    fn one_row(column: &str, value: CellValue) -> QueryResult {
        let mut row = Record::new();
        row.insert(column.to_string(), value);
        QueryResult::new(vec![SchemaField::new(column, "INTEGER")], vec![row])
    }

    fn db() -> BigQueryDatabase {
        let warehouse = InMemoryWarehouse::new("proj")
            .with_query("SELECT 1 AS x", one_row("x", CellValue::Integer(1)))
            .with_query("SELECT 2 AS y", one_row("y", CellValue::Integer(2)))
            .with_failing_query("SELEC", "Syntax error: Unexpected identifier");
        BigQueryDatabase::new(Arc::new(warehouse))
    }

    #[tokio::test]
    async fn successful_query_replaces_cache() {
        let db = db();
        assert!(db.last_result().is_none());

        let first = db.execute_query("SELECT 1 AS x", None).await.unwrap();
        assert!(Arc::ptr_eq(&first, &db.last_result().unwrap()));

        let second = db.execute_query("SELECT 2 AS y", None).await.unwrap();
        assert!(Arc::ptr_eq(&second, &db.last_result().unwrap()));
    }

    #[tokio::test]
    async fn failed_query_keeps_previous_cache() {
        let db = db();
        db.execute_query("SELECT 1 AS x", None).await.unwrap();

        let err = db.execute_query("SELEC", None).await.unwrap_err();
        assert!(matches!(err, WarehouseError::Query(_)));
        assert_eq!(db.last_result().unwrap().column_names(), vec!["x"]);
    }

    #[tokio::test]
    async fn save_last_results_without_query_is_no_results() {
        let db = db();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let err = db.save_last_results_to_csv_file(&path).await.unwrap_err();
        assert!(matches!(err, WarehouseError::NoResults));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn failed_first_query_leaves_cache_empty() {
        let db = db();
        db.execute_query("SELEC", None).await.unwrap_err();
        assert!(db.last_result().is_none());
    }

    #[tokio::test]
    async fn describe_rejects_bad_names_before_calling_warehouse() {
        let db = db();
        for bad in ["a.b.c", "a", ""] {
            let err = db.describe_table(bad).await.unwrap_err();
            assert!(matches!(err, WarehouseError::InvalidName(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn save_csv_auto_uses_defaults_under_directory() {
        let db = db();
        let dir = tempfile::tempdir().unwrap();

        let export = db
            .save_csv_auto("SELECT 1 AS x", Some("  "), Some(dir.path()))
            .await
            .unwrap();

        let name = export.path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("bigquery_export_"), "{name}");
        assert!(name.ends_with(".csv"));
        assert_eq!(export.path.parent(), Some(dir.path()));
        assert_eq!(std::fs::read_to_string(&export.path).unwrap(), "x\n1\n");
    }
}
