//! BigQuery REST v2 request/response bodies.
//!
//! Only the fields this crate reads or writes are modeled; unknown fields are
//! ignored on deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// https://cloud.google.com/bigquery/docs/reference/rest/v2/jobs/query#QueryRequest
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub location: String,
    pub timeout_ms: u64,
    pub max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_mode: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<QueryParameterBody>,
    pub format_options: FormatOptions,
}

/// Ask for TIMESTAMP cells as integer microseconds instead of float seconds.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    pub use_int64_timestamp: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameterBody {
    pub name: String,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterValue {
    pub value: String,
}

// https://cloud.google.com/bigquery/docs/reference/rest/v2/jobs/getQueryResults
// `jobs.query` and `jobs.getQueryResults` share this shape.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub job_complete: bool,
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

/// One result row: `{"f": [{"v": …}, …]}`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TableRow {
    #[serde(rename = "f", default)]
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TableCell {
    #[serde(rename = "v", default)]
    pub value: Value,
}

// https://cloud.google.com/bigquery/docs/reference/rest/v2/datasets/list
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetList {
    #[serde(default)]
    pub datasets: Vec<DatasetListEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetListEntry {
    pub dataset_reference: DatasetReference,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReference {
    pub dataset_id: String,
}

// https://cloud.google.com/bigquery/docs/reference/rest/v2/tables/list
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableList {
    #[serde(default)]
    pub tables: Vec<TableListEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableListEntry {
    pub table_reference: TableReference,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference {
    pub dataset_id: String,
    pub table_id: String,
}

// https://cloud.google.com/bigquery/docs/reference/rest/v2/tables#Table
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub schema: Option<TableSchema>,
}

/// Error envelope returned by Google APIs on non-2xx responses.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: ErrorBody,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_response_parses_rows_and_schema() {
        let body = r#"{
            "kind": "bigquery#queryResponse",
            "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
            "jobComplete": true,
            "totalRows": "1",
            "schema": {"fields": [{"name": "x", "type": "INTEGER", "mode": "NULLABLE"}]},
            "rows": [{"f": [{"v": "1"}]}]
        }"#;
        let resp: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(resp.job_complete);
        assert_eq!(resp.job_reference.unwrap().job_id.as_deref(), Some("job_1"));
        assert_eq!(resp.schema.unwrap().fields[0].field_type, "INTEGER");
        assert_eq!(resp.rows[0].cells[0].value, serde_json::json!("1"));
        assert!(resp.page_token.is_none());
    }

    #[test]
    fn incomplete_job_has_no_rows() {
        let body = r#"{"jobReference": {"jobId": "job_2"}, "jobComplete": false}"#;
        let resp: QueryResponse = serde_json::from_str(body).unwrap();
        assert!(!resp.job_complete);
        assert!(resp.rows.is_empty());
        assert!(resp.schema.is_none());
    }

    #[test]
    fn query_request_omits_empty_parameters() {
        let req = QueryRequest {
            query: "SELECT 1".into(),
            use_legacy_sql: false,
            location: "US".into(),
            timeout_ms: 10_000,
            max_results: 100,
            parameter_mode: None,
            query_parameters: Vec::new(),
            format_options: FormatOptions {
                use_int64_timestamp: true,
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["useLegacySql"], false);
        assert!(json.get("queryParameters").is_none());
        assert!(json.get("parameterMode").is_none());
        assert_eq!(json["formatOptions"]["useInt64Timestamp"], true);
    }

    #[test]
    fn error_envelope_parses() {
        let body = r#"{"error": {"code": 404, "message": "Not found: Dataset p:missing", "status": "NOT_FOUND"}}"#;
        let env: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(env.error.code, 404);
        assert!(env.error.message.contains("missing"));
    }

    #[test]
    fn table_list_parses_references() {
        let body = r#"{
            "tables": [
                {"tableReference": {"projectId": "p", "datasetId": "sales", "tableId": "orders"}}
            ],
            "nextPageToken": "abc"
        }"#;
        let list: TableList = serde_json::from_str(body).unwrap();
        assert_eq!(list.tables[0].table_reference.table_id, "orders");
        assert_eq!(list.next_page_token.as_deref(), Some("abc"));
    }
}
