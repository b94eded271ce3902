//! BigQuery data access for the MCP server.
//!
//! - **config**: `WarehouseConfig` assembled from env vars and CLI overrides
//! - **credentials**: ordered credential resolution chain (key file → ADC)
//! - **client**: the `Warehouse` trait and its BigQuery REST implementation
//! - **result**: closed cell-value model, query results, schema fields
//! - **convert**: REST row decoding and query-parameter inference
//! - **csv_export**: atomic CSV serialization of query results
//! - **database**: `BigQueryDatabase`, the facade owning the last-result cache

pub mod config;
pub mod credentials;
pub mod client;
pub mod wire;
pub mod result;
pub mod convert;
pub mod csv_export;
pub mod database;
pub mod error;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::WarehouseConfig;
pub use credentials::{CredentialChain, CredentialStrategy, Credentials};
pub use client::{BigQueryClient, Warehouse};
pub use result::{CellValue, QueryResult, Record, SchemaField, TableDescription, TableDescriptor};
pub use convert::QueryParameter;
pub use csv_export::{csv_filename, CsvExport};
pub use database::BigQueryDatabase;
pub use error::WarehouseError;
