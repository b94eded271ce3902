//! MCP HTTP+SSE transport endpoints.
//!
//! `GET /sse` opens a session: the first event names the URI to POST to,
//! every later event carries one JSON-RPC response. `POST /messages/`
//! feeds a request into the session's loop and returns immediately.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bqmcp_mcp::{session_channel, McpServer, SessionHandle};

use crate::state::AppState;

/// Frames buffered per session in each direction.
const SESSION_BUFFER: usize = 32;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Path clients POST JSON-RPC messages to.
pub const MESSAGES_PATH: &str = "/messages/";

/// Open an SSE session and start its MCP loop.
pub async fn sse_connect(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let session_id = Uuid::new_v4();
    let (mut transport, handle) = session_channel(SESSION_BUFFER);
    let SessionHandle { inbound, outbound } = handle;

    let endpoint = format!("{MESSAGES_PATH}?session_id={}", session_id.simple());
    transport.announce_endpoint(&endpoint).await.map_err(|e| {
        warn!(error = %e, "Failed to announce session endpoint");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    state.sessions.insert(session_id, inbound).await;
    info!(session = %session_id.simple(), "SSE session opened");

    let registry = Arc::clone(&state.registry);
    let working_dir = state.working_dir.clone();
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut server = McpServer::new(registry).with_working_directory(working_dir);
        if let Err(e) = server.run(&mut transport).await {
            debug!(session = %session_id.simple(), error = %e, "Session loop ended with error");
        }
        sessions.remove(&session_id).await;
        info!(session = %session_id.simple(), "SSE session closed");
    });

    let stream = ReceiverStream::new(outbound)
        .map(|frame| Ok(Event::default().event(frame.event_name()).data(frame.data())));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

#[derive(Debug, Deserialize)]
pub struct MessageParams {
    pub session_id: Option<String>,
}

/// Hand a POSTed JSON-RPC message to its session.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MessageParams>,
    body: String,
) -> (StatusCode, &'static str) {
    let Some(raw_id) = params.session_id else {
        warn!("Message received without session_id");
        return (StatusCode::BAD_REQUEST, "session_id is required");
    };
    let Ok(session_id) = Uuid::parse_str(&raw_id) else {
        warn!(session = %raw_id, "Received invalid session ID");
        return (StatusCode::BAD_REQUEST, "Invalid session ID");
    };
    let Some(inbound) = state.sessions.get(&session_id).await else {
        warn!(session = %session_id.simple(), "Could not find session");
        return (StatusCode::NOT_FOUND, "Could not find session");
    };

    if let Err(e) = serde_json::from_str::<serde_json::Value>(&body) {
        warn!(session = %session_id.simple(), error = %e, "Failed to parse message");
        return (StatusCode::BAD_REQUEST, "Could not parse message");
    }

    debug!(session = %session_id.simple(), "Forwarding message to session");
    if inbound.send(body).await.is_err() {
        state.sessions.remove(&session_id).await;
        return (StatusCode::NOT_FOUND, "Could not find session");
    }

    (StatusCode::ACCEPTED, "Accepted")
}
