//! Command-line flags. Each flag falls back to its environment variable.

use std::path::PathBuf;

use clap::Parser;

pub const DEFAULT_LOG_FILE: &str = "/tmp/mcp_bigquery_server.log";

#[derive(Parser, Debug)]
#[command(name = "bqmcp-server", version, about = "BigQuery MCP server over HTTP+SSE")]
pub struct Cli {
    /// GCP project (overrides BIGQUERY_PROJECT / GOOGLE_CLOUD_PROJECT).
    #[arg(long)]
    pub project: Option<String>,

    /// BigQuery location (overrides BIGQUERY_LOCATION / GOOGLE_CLOUD_LOCATION).
    #[arg(long)]
    pub location: Option<String>,

    /// Service account key file (overrides BIGQUERY_KEY_FILE).
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// Address to bind.
    #[arg(long, env = "MCP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind.
    #[arg(long, env = "MCP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log file written alongside stdout.
    #[arg(long, env = "MCP_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Query job timeout (overrides BIGQUERY_TIMEOUT_SECONDS).
    #[arg(long)]
    pub timeout_seconds: Option<u32>,
}

impl Cli {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
