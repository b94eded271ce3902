use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::WarehouseError;

/// Default BigQuery REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Default job timeout, matching the client library's five minute budget.
const DEFAULT_TIMEOUT_SECONDS: u32 = 300;

/// Rows requested per `getQueryResults` page.
const DEFAULT_PAGE_SIZE: u32 = 10_000;

// ── Env helpers ──────────────────────────────────────────────────

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// First non-empty value among `keys`, in order.
fn env_first(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| env_opt(k))
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── WarehouseConfig ──────────────────────────────────────────────

/// Connection settings for the BigQuery client.
///
/// Immutable once handed to [`crate::BigQueryDatabase::connect`].
/// Values come from the environment first; CLI flags override them via
/// [`WarehouseConfig::with_overrides`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// GCP project that owns the datasets and bills the queries.
    pub project: String,
    /// BigQuery location (e.g. "US", "EU", "asia-southeast1").
    pub location: String,
    /// Explicit service account key file. Takes precedence over ambient credentials.
    pub key_file: Option<PathBuf>,
    /// REST base URL, overridable for emulators.
    pub api_base: String,
    /// How long to wait for a query job to complete.
    pub timeout_seconds: u32,
    /// Rows per result page.
    pub page_size: u32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            project: String::new(),
            location: String::new(),
            key_file: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl WarehouseConfig {
    /// Build config from environment variables.
    ///
    /// - project: `BIGQUERY_PROJECT`, then `GOOGLE_CLOUD_PROJECT`
    /// - location: `BIGQUERY_LOCATION`, then `GOOGLE_CLOUD_LOCATION`
    /// - key file: `BIGQUERY_KEY_FILE`
    /// - `BIGQUERY_API_BASE`, `BIGQUERY_TIMEOUT_SECONDS`, `BIGQUERY_PAGE_SIZE`
    pub fn from_env() -> Self {
        Self {
            project: env_first(&["BIGQUERY_PROJECT", "GOOGLE_CLOUD_PROJECT"]).unwrap_or_default(),
            location: env_first(&["BIGQUERY_LOCATION", "GOOGLE_CLOUD_LOCATION"])
                .unwrap_or_default(),
            key_file: env_opt("BIGQUERY_KEY_FILE").map(PathBuf::from),
            api_base: env_opt("BIGQUERY_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            timeout_seconds: env_u32("BIGQUERY_TIMEOUT_SECONDS", DEFAULT_TIMEOUT_SECONDS),
            page_size: env_u32("BIGQUERY_PAGE_SIZE", DEFAULT_PAGE_SIZE),
        }
    }

    /// Apply explicit values (typically CLI flags) on top of this config.
    /// `None` keeps the existing value.
    pub fn with_overrides(
        mut self,
        project: Option<String>,
        location: Option<String>,
        key_file: Option<PathBuf>,
        timeout_seconds: Option<u32>,
    ) -> Self {
        if let Some(p) = project.filter(|s| !s.is_empty()) {
            self.project = p;
        }
        if let Some(l) = location.filter(|s| !s.is_empty()) {
            self.location = l;
        }
        if key_file.is_some() {
            self.key_file = key_file;
        }
        if let Some(t) = timeout_seconds {
            self.timeout_seconds = t;
        }
        self
    }

    /// Check that the settings needed to open a client are present.
    pub fn validate(&self) -> Result<(), WarehouseError> {
        if self.project.trim().is_empty() {
            return Err(WarehouseError::Config("Project is required".into()));
        }
        if self.location.trim().is_empty() {
            return Err(WarehouseError::Config("Location is required".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(WarehouseError::Config("Timeout must be positive".into()));
        }
        Ok(())
    }

    /// `api_base` without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }
}

// ── Tests ────────────────────────────────────────────────────────
