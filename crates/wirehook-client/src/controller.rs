//! The reconnect controller: the client side of the relay tunnel.
//!
//! One controller instance drives one gateway connection at a time through
//! `Connecting → Registering → Active → Disconnected → Backoff` and keeps
//! the remote webhook subscription pointed at whichever connection id is
//! currently live. Transitions are awaited results — connect, handshake
//! reply or timeout, channel closed — not callbacks, so cancellation and
//! backoff are linear control flow. Shutdown is observed at every
//! suspension point.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wirehook_core::backoff::ReconnectBackoff;
use wirehook_core::ids::ConnectionId;
use wirehook_core::protocol::{self, ClientMessage, RegistrationAck};

use crate::config::ListenConfig;
use crate::error::ListenError;
use crate::output::EventSink;
use crate::platform::PlatformClient;
use crate::subscription::SubscriptionManager;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Observable controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    Connecting,
    Registering,
    Active,
    Backoff,
    ShuttingDown,
}

/// Read-only view of a running controller, for watchers on other tasks.
#[derive(Clone)]
pub struct ControllerObserver {
    state: Arc<Mutex<ControllerState>>,
    connection_id: Arc<Mutex<Option<ConnectionId>>>,
}

impl ControllerObserver {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    /// The registered connection id, while one is live.
    #[must_use]
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id.lock().clone()
    }
}

/// Drives the tunnel: connects, registers, subscribes, consumes, reconnects.
pub struct ReconnectController<C: PlatformClient> {
    config: ListenConfig,
    subscriptions: SubscriptionManager<C>,
    sink: Arc<dyn EventSink>,
    shutdown: CancellationToken,
    state: Arc<Mutex<ControllerState>>,
    connection_id: Arc<Mutex<Option<ConnectionId>>>,
}

impl<C: PlatformClient> ReconnectController<C> {
    pub fn new(config: ListenConfig, client: C, sink: Arc<dyn EventSink>) -> Self {
        let mut subscriptions = SubscriptionManager::new(
            client,
            config.relay_url.clone(),
            config.subscribed_events.clone(),
        )
        .keep_on_teardown(config.no_cleanup);
        if let Some(id) = config.subscription.clone() {
            subscriptions = subscriptions.adopt(id);
        }

        Self {
            config,
            subscriptions,
            sink,
            shutdown: CancellationToken::new(),
            state: Arc::new(Mutex::new(ControllerState::Connecting)),
            connection_id: Arc::new(Mutex::new(None)),
        }
    }

    /// Token that stops the controller when cancelled. Cancellation
    /// interrupts a pending handshake or backoff sleep immediately.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// A cloneable view for watching state from another task.
    #[must_use]
    pub fn observer(&self) -> ControllerObserver {
        ControllerObserver {
            state: Arc::clone(&self.state),
            connection_id: Arc::clone(&self.connection_id),
        }
    }

    fn set_state(&self, state: ControllerState) {
        *self.state.lock() = state;
    }

    /// Drive the tunnel until shutdown or a fatal error.
    ///
    /// Fatal means: the broker rejected the credential token on the very
    /// first attempt, or the initial subscription could not be set up.
    /// Everything else feeds the backoff loop.
    pub async fn run(&mut self) -> Result<(), ListenError> {
        let result = self.run_loop().await;
        // Cleanup runs on every exit path, fatal errors included.
        self.set_state(ControllerState::ShuttingDown);
        self.subscriptions.teardown().await;
        result
    }

    async fn run_loop(&mut self) -> Result<(), ListenError> {
        let mut backoff = ReconnectBackoff::new(
            self.config.reconnect_initial_delay,
            self.config.reconnect_max_delay,
        );
        let mut first_attempt = true;

        while !self.shutdown.is_cancelled() {
            match self.connect_and_register().await {
                Ok((ws, connection_id)) => {
                    backoff.reset();
                    info!(connection_id = %connection_id, "connected to relay");
                    *self.connection_id.lock() = Some(connection_id.clone());

                    if self.subscriptions.has_subscription() {
                        self.subscriptions.retarget(&connection_id).await;
                    } else {
                        self.subscriptions.activate(&connection_id).await?;
                    }
                    first_attempt = false;

                    self.set_state(ControllerState::Active);
                    self.consume(ws).await;
                    *self.connection_id.lock() = None;

                    if self.shutdown.is_cancelled() {
                        break;
                    }
                }
                Err(e) => {
                    if first_attempt && e.is_auth_rejection() {
                        return Err(e);
                    }
                    first_attempt = false;
                    debug!(error = %e, "connection attempt failed");
                }
            }

            if self.shutdown.is_cancelled() {
                break;
            }

            self.set_state(ControllerState::Backoff);
            let delay = backoff.next_delay();
            info!(
                delay_ms = delay.as_millis() as u64,
                attempt = backoff.attempt(),
                "disconnected from relay, reconnecting after backoff"
            );
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.cancelled() => break,
            }
        }

        Ok(())
    }

    /// One connection attempt: open the socket, send init, await the ack.
    /// The whole exchange is bounded by the handshake timeout and raced
    /// against shutdown.
    async fn connect_and_register(&self) -> Result<(WsStream, ConnectionId), ListenError> {
        self.set_state(ControllerState::Connecting);
        let url = gateway_url_with_token(&self.config.gateway_url, &self.config.token);

        let handshake = async {
            let (mut ws, _response) = connect_async(url.as_str())
                .await
                .map_err(|e| ListenError::Connect(e.to_string()))?;

            self.set_state(ControllerState::Registering);
            let init = serde_json::to_string(&ClientMessage::Init)
                .map_err(|e| ListenError::Connect(e.to_string()))?;
            // A broker that refused the token closes right after the
            // upgrade; the init send may fail then, but the close frame and
            // its code are still waiting in the read path.
            if let Err(e) = ws.send(Message::Text(init.into())).await {
                debug!(error = %e, "init send failed, draining close reason");
            }

            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(ack) = serde_json::from_str::<RegistrationAck>(text.as_str()) {
                            return Ok((ws, ack.connection_id));
                        }
                        // Not the ack; keep waiting.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.as_ref().map_or(0, |f| u16::from(f.code));
                        if code == protocol::CLOSE_UNAUTHORIZED {
                            return Err(ListenError::AuthRejected { code });
                        }
                        return Err(ListenError::ConnectionClosed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ListenError::Connect(e.to_string())),
                    None => return Err(ListenError::ConnectionClosed),
                }
            }
        };

        tokio::select! {
            result = timeout(self.config.handshake_timeout, handshake) => match result {
                Ok(inner) => inner,
                Err(_) => Err(ListenError::HandshakeTimeout(self.config.handshake_timeout)),
            },
            () = self.shutdown.cancelled() => Err(ListenError::ConnectionClosed),
        }
    }

    /// Pump forwarded events until the channel closes or shutdown.
    async fn consume(&self, mut ws: WsStream) {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    let _ = ws.close(None).await;
                    return;
                }
                frame = ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = ws.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "gateway read error");
                        return;
                    }
                }
            }
        }
    }

    /// Decode one forwarded frame and emit it if it survives filtering.
    fn handle_frame(&self, raw: &str) {
        let event: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => {
                // Discard the frame; the connection stays open.
                warn!("discarding malformed gateway frame");
                return;
            }
        };

        if protocol::is_registration_ack(&event) {
            // Late duplicate of the handshake reply.
            return;
        }

        let event_type = event.get("event_type").and_then(Value::as_str);
        if !self.config.filter.allows(event_type) {
            debug!(
                event_type = event_type.unwrap_or("unknown"),
                "event dropped by filter"
            );
            return;
        }

        self.sink.emit(raw, &event);
    }
}

/// Append the credential token to the gateway URL as a query parameter.
fn gateway_url_with_token(gateway_url: &str, token: &str) -> String {
    let sep = if gateway_url.contains('?') { '&' } else { '?' };
    format!("{gateway_url}{sep}token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatformClient;
    use crate::output::ChannelSink;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;
    use wirehook_core::events::{EventFilter, WebhookEventType};

    fn make_controller(
        filter: EventFilter,
    ) -> (
        ReconnectController<MockPlatformClient>,
        UnboundedReceiver<Value>,
    ) {
        let mut config =
            ListenConfig::new("http://localhost:3001", "ws://localhost:3001/gateway", "t");
        config.filter = filter;
        let (sink, rx) = ChannelSink::new();
        let controller =
            ReconnectController::new(config, MockPlatformClient::new(), Arc::new(sink));
        (controller, rx)
    }

    #[test]
    fn token_appended_as_query_param() {
        assert_eq!(
            gateway_url_with_token("ws://localhost:3001/gateway", "abc"),
            "ws://localhost:3001/gateway?token=abc"
        );
        assert_eq!(
            gateway_url_with_token("ws://localhost:3001/gateway?x=1", "abc"),
            "ws://localhost:3001/gateway?x=1&token=abc"
        );
    }

    #[tokio::test]
    async fn frame_passing_filter_is_emitted() {
        let (controller, mut rx) = make_controller(EventFilter::All);
        controller.handle_frame(r#"{"event_type":"message.received","message":{"id":"msg_1"}}"#);
        let event = rx.recv().await.unwrap();
        assert_eq!(event["event_type"], "message.received");
        assert_eq!(event["message"]["id"], "msg_1");
    }

    #[tokio::test]
    async fn frame_outside_allow_list_is_dropped() {
        let (controller, mut rx) =
            make_controller(EventFilter::only(vec![WebhookEventType::MessageReceived]));
        controller.handle_frame(r#"{"event_type":"message.sent"}"#);
        controller.handle_frame(r#"{"event_type":"message.received"}"#);

        let event = rx.recv().await.unwrap();
        assert_eq!(event["event_type"], "message.received");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn registration_ack_shape_is_ignored() {
        let (controller, mut rx) = make_controller(EventFilter::All);
        controller.handle_frame(r#"{"connectionId":"local-1"}"#);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_frame_is_discarded() {
        let (controller, mut rx) = make_controller(EventFilter::All);
        controller.handle_frame("not json at all");
        controller.handle_frame(r#"{"event_type":"chat.created"}"#);

        // The malformed frame is dropped; the next one still flows.
        let event = rx.recv().await.unwrap();
        assert_eq!(event["event_type"], "chat.created");
    }

    #[tokio::test]
    async fn event_without_type_passes_any_filter() {
        let (controller, mut rx) =
            make_controller(EventFilter::only(vec![WebhookEventType::MessageReceived]));
        controller.handle_frame(json!({"data": {"id": 1}}).to_string().as_str());
        let event = rx.recv().await.unwrap();
        assert_eq!(event["data"]["id"], 1);
    }

    #[test]
    fn observer_tracks_initial_state() {
        let (controller, _rx) = make_controller(EventFilter::All);
        let observer = controller.observer();
        assert_eq!(observer.state(), ControllerState::Connecting);
        assert!(observer.connection_id().is_none());
    }
}
