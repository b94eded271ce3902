//! BigQuery REST client.
//!
//! [`Warehouse`] is the seam between the facade and the service: the
//! production implementation is [`BigQueryClient`], which talks to the
//! BigQuery v2 REST API with a bearer token, polls incomplete jobs with
//! exponential backoff and follows result pages until every row is in
//! memory.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::WarehouseConfig;
use crate::convert::{decode_rows, QueryParameter};
use crate::credentials::{CredentialChain, Credentials};
use crate::error::WarehouseError;
use crate::result::{CellValue, QueryResult, SchemaField, TableDescriptor};
use crate::wire;

/// Upper bound for the server-side wait of a single `jobs.query` call.
const MAX_QUERY_WAIT_MS: u64 = 10_000;

/// Server-side wait for each `getQueryResults` poll.
const POLL_WAIT_MS: u64 = 1_000;

/// Page size for dataset and table listings.
const LIST_PAGE_SIZE: u32 = 1_000;

// ---------------------------------------------------------------------------
// Warehouse trait
// ---------------------------------------------------------------------------

/// Operations the facade needs from BigQuery.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Project the warehouse is bound to.
    fn project(&self) -> &str;

    /// Run a standard-SQL query and materialize every row.
    async fn run_query(
        &self,
        sql: &str,
        params: &[QueryParameter],
    ) -> Result<QueryResult, WarehouseError>;

    /// Dataset ids of the project, in service order.
    async fn list_datasets(&self) -> Result<Vec<String>, WarehouseError>;

    /// Table ids of one dataset. Unknown dataset → [`WarehouseError::DatasetNotFound`].
    async fn list_tables(&self, dataset: &str) -> Result<Vec<String>, WarehouseError>;

    /// Column metadata. Unknown table → [`WarehouseError::TableNotFound`].
    async fn table_schema(&self, table: &TableDescriptor)
        -> Result<Vec<SchemaField>, WarehouseError>;

    /// `CREATE TABLE` statement from `INFORMATION_SCHEMA.TABLES`, if any.
    async fn table_ddl(&self, table: &TableDescriptor) -> Result<Option<String>, WarehouseError>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`Warehouse`] backed by the BigQuery v2 REST API.
pub struct BigQueryClient {
    config: WarehouseConfig,
    http: reqwest::Client,
    /// `None` only for emulator endpoints that accept anonymous requests.
    credentials: Option<Credentials>,
}

impl BigQueryClient {
    /// Validate `config`, resolve credentials through the [`CredentialChain`]
    /// and build a client.
    pub async fn connect(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        config.validate()?;
        let credentials = CredentialChain::for_config(&config).resolve().await?;
        let client = Self::build(config, Some(credentials))?;

        info!(
            project = %client.config.project,
            location = %client.config.location,
            api_base = %client.config.base_url(),
            "BigQueryClient initialised"
        );
        Ok(client)
    }

    /// Client that sends no `Authorization` header (local emulators).
    pub fn unauthenticated(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        Self::build(config, None)
    }

    fn build(
        config: WarehouseConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, WarehouseError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("bqmcp/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            config,
            http,
            credentials,
        })
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn project_url(&self) -> String {
        format!(
            "{}/projects/{}",
            self.config.base_url(),
            urlencoding::encode(&self.config.project)
        )
    }

    async fn authorize(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, WarehouseError> {
        match &self.credentials {
            Some(c) => Ok(req.bearer_auth(c.bearer_token().await?)),
            None => Ok(req),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, WarehouseError> {
        let req = self.authorize(self.http.get(url).query(query)).await?;
        read_json(req.send().await?).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, WarehouseError> {
        let req = self.authorize(self.http.post(url).json(body)).await?;
        read_json(req.send().await?).await
    }

    // -----------------------------------------------------------------------
    // Query lifecycle
    // -----------------------------------------------------------------------

    /// `jobs.query` → poll → paginate → decode. Errors are not yet mapped
    /// to [`WarehouseError::Query`].
    async fn query_all(
        &self,
        sql: &str,
        params: &[QueryParameter],
    ) -> Result<QueryResult, WarehouseError> {
        let start = Instant::now();
        let timeout = Duration::from_secs(u64::from(self.config.timeout_seconds));

        let request = wire::QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            location: self.config.location.clone(),
            timeout_ms: (timeout.as_millis() as u64).min(MAX_QUERY_WAIT_MS),
            max_results: self.config.page_size,
            parameter_mode: (!params.is_empty()).then(|| "NAMED".to_string()),
            query_parameters: params.iter().map(QueryParameter::to_wire).collect(),
            format_options: wire::FormatOptions {
                use_int64_timestamp: true,
            },
        };

        let url = format!("{}/queries", self.project_url());
        let mut response: wire::QueryResponse = self.post_json(&url, &request).await?;

        let job = response.job_reference.clone().unwrap_or_default();
        let location = job
            .location
            .clone()
            .unwrap_or_else(|| self.config.location.clone());

        if !response.job_complete {
            let job_id = job
                .job_id
                .clone()
                .ok_or_else(|| WarehouseError::Decode("incomplete job without a job id".into()))?;
            response = self
                .poll_until_complete(&job_id, &location, start, timeout)
                .await?;
        }

        for e in &response.errors {
            warn!(reason = ?e.reason, message = %e.message, "BigQuery reported a job error");
        }

        let columns: Vec<SchemaField> = response
            .schema
            .take()
            .map(|s| s.fields.into_iter().map(SchemaField::from).collect())
            .unwrap_or_default();
        let mut rows = decode_rows(&columns, std::mem::take(&mut response.rows))?;

        let mut page_token = response.page_token.take();
        while let Some(token) = page_token {
            let job_id = job
                .job_id
                .as_deref()
                .ok_or_else(|| WarehouseError::Decode("paged result without a job id".into()))?;
            let page = self
                .fetch_results(job_id, &location, Some(&token), POLL_WAIT_MS)
                .await?;
            debug!(job_id = %job_id, rows = page.rows.len(), "Fetched result page");
            rows.extend(decode_rows(&columns, page.rows)?);
            page_token = page.page_token;
        }

        info!(
            job_id = ?job.job_id,
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );
        Ok(QueryResult::new(columns, rows))
    }

    async fn fetch_results(
        &self,
        job_id: &str,
        location: &str,
        page_token: Option<&str>,
        wait_ms: u64,
    ) -> Result<wire::QueryResponse, WarehouseError> {
        let url = format!(
            "{}/queries/{}",
            self.project_url(),
            urlencoding::encode(job_id)
        );
        let mut query = vec![
            ("location", location.to_string()),
            ("maxResults", self.config.page_size.to_string()),
            ("timeoutMs", wait_ms.to_string()),
            ("formatOptions.useInt64Timestamp", "true".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.get_json(&url, &query).await
    }

    /// Poll `getQueryResults` with exponential backoff until the job
    /// completes or the configured timeout is exceeded.
    async fn poll_until_complete(
        &self,
        job_id: &str,
        location: &str,
        start: Instant,
        timeout: Duration,
    ) -> Result<wire::QueryResponse, WarehouseError> {
        let initial_delay_ms: u64 = 200;
        let max_delay_ms: u64 = 2000;
        let backoff_factor: f64 = 1.5;

        let mut delay_ms = initial_delay_ms;

        loop {
            if start.elapsed() > timeout {
                warn!(
                    job_id = %job_id,
                    timeout_seconds = self.config.timeout_seconds,
                    "Query timed out"
                );
                return Err(WarehouseError::Query(format!(
                    "Query {job_id} timed out after {}s",
                    self.config.timeout_seconds
                )));
            }

            // Jitter without rand: nanosecond fraction of the wall clock.
            let jitter_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos()
                % 100;
            tokio::time::sleep(Duration::from_millis(delay_ms + u64::from(jitter_ms))).await;

            let response = self
                .fetch_results(job_id, location, None, POLL_WAIT_MS)
                .await?;

            debug!(
                job_id = %job_id,
                complete = response.job_complete,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Polling query status"
            );

            if response.job_complete {
                return Ok(response);
            }

            delay_ms = ((delay_ms as f64 * backoff_factor) as u64).min(max_delay_ms);
        }
    }
}

/// Turn any failure during a query into [`WarehouseError::Query`].
fn into_query_error(err: WarehouseError) -> WarehouseError {
    match err {
        WarehouseError::Query(_) => err,
        WarehouseError::Api { message, .. } => WarehouseError::Query(message),
        other => WarehouseError::Query(other.to_string()),
    }
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, WarehouseError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<wire::ErrorEnvelope>(&body)
            .ok()
            .map(|e| e.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or(body);
        return Err(WarehouseError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| WarehouseError::Decode(e.to_string()))
}

#[async_trait]
impl Warehouse for BigQueryClient {
    fn project(&self) -> &str {
        &self.config.project
    }

    async fn run_query(
        &self,
        sql: &str,
        params: &[QueryParameter],
    ) -> Result<QueryResult, WarehouseError> {
        info!(sql = %sql, params = params.len(), "Starting BigQuery query");
        self.query_all(sql, params).await.map_err(into_query_error)
    }

    async fn list_datasets(&self) -> Result<Vec<String>, WarehouseError> {
        let url = format!("{}/datasets", self.project_url());
        let mut datasets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", LIST_PAGE_SIZE.to_string())];
            if let Some(t) = &page_token {
                query.push(("pageToken", t.clone()));
            }
            let page: wire::DatasetList = self.get_json(&url, &query).await?;
            datasets.extend(
                page.datasets
                    .into_iter()
                    .map(|d| d.dataset_reference.dataset_id),
            );
            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }

        debug!(count = datasets.len(), "Listed datasets");
        Ok(datasets)
    }

    async fn list_tables(&self, dataset: &str) -> Result<Vec<String>, WarehouseError> {
        let url = format!(
            "{}/datasets/{}/tables",
            self.project_url(),
            urlencoding::encode(dataset)
        );
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", LIST_PAGE_SIZE.to_string())];
            if let Some(t) = &page_token {
                query.push(("pageToken", t.clone()));
            }
            let page: wire::TableList = self.get_json(&url, &query).await.map_err(|e| {
                if e.is_not_found() {
                    WarehouseError::DatasetNotFound(dataset.to_string())
                } else {
                    e
                }
            })?;
            tables.extend(page.tables.into_iter().map(|t| t.table_reference.table_id));
            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }

        debug!(dataset = %dataset, count = tables.len(), "Listed tables");
        Ok(tables)
    }

    async fn table_schema(
        &self,
        table: &TableDescriptor,
    ) -> Result<Vec<SchemaField>, WarehouseError> {
        let url = format!(
            "{}/datasets/{}/tables/{}",
            self.project_url(),
            urlencoding::encode(&table.dataset),
            urlencoding::encode(&table.table)
        );
        let meta: wire::Table = self.get_json(&url, &[]).await.map_err(|e| {
            if e.is_not_found() {
                WarehouseError::TableNotFound(table.to_string())
            } else {
                e
            }
        })?;

        Ok(meta
            .schema
            .map(|s| s.fields.into_iter().map(SchemaField::from).collect())
            .unwrap_or_default())
    }

    async fn table_ddl(&self, table: &TableDescriptor) -> Result<Option<String>, WarehouseError> {
        if table.dataset.contains('`') || self.config.project.contains('`') {
            return Err(WarehouseError::InvalidName(table.to_string()));
        }
        let sql = format!(
            "SELECT ddl FROM `{}.{}`.INFORMATION_SCHEMA.TABLES WHERE table_name = @table_name",
            self.config.project, table.dataset
        );
        let params = [QueryParameter::string("table_name", table.table.clone())];
        let result = self
            .query_all(&sql, &params)
            .await
            .map_err(into_query_error)?;

        Ok(result.rows.first().and_then(|row| match row.get("ddl") {
            Some(CellValue::Text(ddl)) if !ddl.is_empty() => Some(ddl.clone()),
            _ => None,
        }))
    }
}
