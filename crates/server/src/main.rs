mod cli;
mod health;
mod logging;
mod router;
mod sessions;
mod sse;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use bqmcp_tool_runtime::bigquery_registry;
use bqmcp_warehouse::{BigQueryDatabase, WarehouseConfig};

use crate::cli::Cli;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = logging::init(&cli.log_file);

    let config = WarehouseConfig::from_env().with_overrides(
        cli.project.clone(),
        cli.location.clone(),
        cli.key_file.clone(),
        cli.timeout_seconds,
    );
    info!(
        project = %config.project,
        location = %config.location,
        log_file = %cli.log_file.display(),
        "Starting BigQuery MCP server"
    );

    let db = BigQueryDatabase::connect(config)
        .await
        .context("Failed to initialize BigQuery client")?;
    let project = db.project().to_string();

    let registry = bigquery_registry(Arc::new(db)).context("Failed to register tools")?;
    info!(tools = registry.len(), "Tools registered");

    let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let state = Arc::new(AppState::new(Arc::new(registry), project, working_dir));
    let app = router::build_router(state);

    let addr = cli.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on http://{}/sse", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
