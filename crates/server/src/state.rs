use std::path::PathBuf;
use std::sync::Arc;

use bqmcp_tool_runtime::ToolRegistry;

use crate::sessions::SessionRegistry;

/// Shared by every HTTP handler and session loop.
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    pub sessions: SessionRegistry,
    /// Project id reported by `/health`.
    pub project: String,
    /// Base for relative CSV paths.
    pub working_dir: PathBuf,
}

impl AppState {
    pub fn new(registry: Arc<ToolRegistry>, project: impl Into<String>, working_dir: PathBuf) -> Self {
        Self {
            registry,
            sessions: SessionRegistry::new(),
            project: project.into(),
            working_dir,
        }
    }
}
