//! Error types for the warehouse crate.

use std::path::PathBuf;

/// Errors that can occur while talking to BigQuery or exporting results.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No credential strategy produced usable credentials.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The query was rejected, failed, or timed out.
    #[error("Query failed: {0}")]
    Query(String),

    /// The named dataset does not exist in the project.
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    /// The named table does not exist.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A table name was not of the form `dataset.table`.
    #[error("Invalid table name '{0}': expected 'dataset.table'")]
    InvalidName(String),

    /// No query has succeeded yet in this process.
    #[error("No previous query results available. Execute a query first.")]
    NoResults,

    /// Writing an export to the filesystem failed.
    #[error("Failed to write '{}': {message}", path.display())]
    IoWrite { path: PathBuf, message: String },

    /// BigQuery answered with a non-success status.
    #[error("BigQuery API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The HTTP request itself failed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl WarehouseError {
    /// Build an [`WarehouseError::IoWrite`] for `path`.
    pub fn io_write(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        WarehouseError::IoWrite {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this is an API error carrying HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WarehouseError::Api { status: 404, .. })
    }
}
