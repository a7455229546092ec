//! Gateway: the WebSocket endpoint clients connect out to.
//!
//! Lifecycle per connection: authorize the token, wait for the init frame,
//! allocate and register a connection id, ack it, then pump forwarded events
//! until the socket closes. The registry entry is removed on close through
//! the channel-guarded unregister.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info};

use wirehook_core::protocol::{
    ClientMessage, RegistrationAck, CLOSE_UNAUTHORIZED, CLOSE_UNAUTHORIZED_REASON,
};

use crate::registry::ConnectionHandle;
use crate::server::AppState;

/// Connection parameters carried on the upgrade request.
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    /// Credential token; its absence refuses the connection.
    pub token: Option<String>,
}

/// `GET /gateway` — WebSocket upgrade.
pub async fn gateway_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_gateway(socket, params.token, state))
}

async fn handle_gateway(mut socket: WebSocket, token: Option<String>, state: AppState) {
    if !state.token_policy.authorize(token.as_deref()) {
        info!("gateway connection refused: no credential token");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_UNAUTHORIZED,
                reason: CLOSE_UNAUTHORIZED_REASON.into(),
            })))
            .await;
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Everything the broker sends — the ack included — goes through one
    // ordered queue, so the ack cannot arrive after a forwarded event.
    let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(state.config.max_send_queue);
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let handle = ConnectionHandle::new(tx);
    let mut connection_id = None;

    loop {
        let msg = tokio::select! {
            () = handle.closed() => break,
            msg = ws_rx.next() => match msg {
                Some(Ok(msg)) => msg,
                Some(Err(_)) | None => break,
            },
        };
        match msg {
            Message::Text(text) => {
                if connection_id.is_some() {
                    // The protocol has no post-registration client frames.
                    debug!("ignoring client frame after registration");
                    continue;
                }
                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Init) => {
                        let id = state.ids.next_id();
                        state.registry.register(id.clone(), handle.clone());
                        let ack = RegistrationAck {
                            connection_id: id.clone(),
                        };
                        if let Ok(frame) = serde_json::to_string(&ack) {
                            let _ = handle.forward(frame);
                        }
                        info!(
                            connection_id = %id,
                            active = state.registry.count(),
                            "client registered"
                        );
                        connection_id = Some(id);
                    }
                    Err(_) => {
                        // Malformed frames before init are dropped.
                        debug!("ignoring unrecognized gateway frame");
                    }
                }
            }
            Message::Close(_) => break,
            // axum answers pings itself.
            _ => {}
        }
    }

    if let Some(id) = connection_id {
        if state.registry.unregister(&id, &handle) {
            info!(
                connection_id = %id,
                active = state.registry.count(),
                "client disconnected"
            );
        }
    }
    writer.abort();
}
