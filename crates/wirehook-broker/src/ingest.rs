//! Ingestion: webhook pushes enter here and leave over the gateway.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::{debug, warn};

use wirehook_core::ids::ConnectionId;

use crate::server::AppState;

/// `POST /relay/{connection_id}` — forward an event to one connection.
///
/// Always replies 200. The caller is the remote platform; a dead or missing
/// local client is not something it should retry or alert over, so
/// undeliverable events are logged here and dropped.
pub async fn ingest_handler(
    Path(connection_id): Path<ConnectionId>,
    State(state): State<AppState>,
    body: Bytes,
) -> StatusCode {
    let Some(handle) = state.registry.lookup(&connection_id) else {
        debug!(connection_id = %connection_id, "no connection for relay push");
        return StatusCode::OK;
    };

    match String::from_utf8(body.to_vec()) {
        Ok(frame) => {
            if handle.forward(frame) {
                debug!(connection_id = %connection_id, "event forwarded");
            } else {
                warn!(
                    connection_id = %connection_id,
                    "send queue full or closed, event dropped"
                );
            }
        }
        Err(_) => {
            // The gateway is a text protocol.
            warn!(connection_id = %connection_id, "non-UTF-8 relay body dropped");
        }
    }

    StatusCode::OK
}
