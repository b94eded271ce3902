//! In-memory [`Warehouse`] for tests.
//!
//! Enabled for this crate's own tests and, via the `test-utils` feature,
//! for downstream crates.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::client::Warehouse;
use crate::convert::QueryParameter;
use crate::error::WarehouseError;
use crate::result::{QueryResult, SchemaField, TableDescriptor};

#[derive(Debug, Clone)]
struct FakeTable {
    fields: Vec<SchemaField>,
    ddl: Option<String>,
}

/// Canned datasets, tables and query answers.
///
/// Queries are matched on their trimmed SQL text. Anything not registered
/// fails with [`WarehouseError::Query`].
#[derive(Debug, Default)]
pub struct InMemoryWarehouse {
    project: String,
    datasets: IndexMap<String, IndexMap<String, FakeTable>>,
    queries: HashMap<String, Result<QueryResult, String>>,
    executed: Mutex<Vec<(String, Vec<QueryParameter>)>>,
}

impl InMemoryWarehouse {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Default::default()
        }
    }

    /// Register a dataset with no tables.
    pub fn with_dataset(mut self, dataset: &str) -> Self {
        self.datasets.entry(dataset.to_string()).or_default();
        self
    }

    pub fn with_table(
        mut self,
        dataset: &str,
        table: &str,
        fields: Vec<SchemaField>,
        ddl: Option<&str>,
    ) -> Self {
        self.datasets.entry(dataset.to_string()).or_default().insert(
            table.to_string(),
            FakeTable {
                fields,
                ddl: ddl.map(str::to_string),
            },
        );
        self
    }

    pub fn with_query(mut self, sql: &str, result: QueryResult) -> Self {
        self.queries.insert(sql.trim().to_string(), Ok(result));
        self
    }

    pub fn with_failing_query(mut self, sql: &str, message: &str) -> Self {
        self.queries
            .insert(sql.trim().to_string(), Err(message.to_string()));
        self
    }

    /// SQL and parameters of every `run_query` call, in call order.
    pub fn executed(&self) -> Vec<(String, Vec<QueryParameter>)> {
        self.executed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn query_count(&self) -> usize {
        self.executed.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    fn project(&self) -> &str {
        &self.project
    }

    async fn run_query(
        &self,
        sql: &str,
        params: &[QueryParameter],
    ) -> Result<QueryResult, WarehouseError> {
        self.executed
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((sql.to_string(), params.to_vec()));

        match self.queries.get(sql.trim()) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(WarehouseError::Query(message.clone())),
            None => Err(WarehouseError::Query(format!("Unrecognized query: {sql}"))),
        }
    }

    async fn list_datasets(&self) -> Result<Vec<String>, WarehouseError> {
        Ok(self.datasets.keys().cloned().collect())
    }

    async fn list_tables(&self, dataset: &str) -> Result<Vec<String>, WarehouseError> {
        self.datasets
            .get(dataset)
            .map(|tables| tables.keys().cloned().collect())
            .ok_or_else(|| WarehouseError::DatasetNotFound(dataset.to_string()))
    }

    async fn table_schema(
        &self,
        table: &TableDescriptor,
    ) -> Result<Vec<SchemaField>, WarehouseError> {
        self.datasets
            .get(&table.dataset)
            .and_then(|tables| tables.get(&table.table))
            .map(|t| t.fields.clone())
            .ok_or_else(|| WarehouseError::TableNotFound(table.to_string()))
    }

    async fn table_ddl(&self, table: &TableDescriptor) -> Result<Option<String>, WarehouseError> {
        Ok(self
            .datasets
            .get(&table.dataset)
            .and_then(|tables| tables.get(&table.table))
            .and_then(|t| t.ddl.clone()))
    }
}
