//! Listener configuration.

use std::time::Duration;

use wirehook_core::backoff;
use wirehook_core::events::{EventFilter, WebhookEventType};
use wirehook_core::ids::SubscriptionId;

/// How long to wait for the connect + registration handshake before treating
/// the attempt as failed.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Inputs to one [`crate::controller::ReconnectController`] run.
#[derive(Clone, Debug)]
pub struct ListenConfig {
    /// Broker HTTP base URL; target URLs are built from it.
    pub relay_url: String,
    /// Broker WebSocket gateway URL.
    pub gateway_url: String,
    /// Credential token attached to the gateway connection.
    pub token: String,
    /// Allow-list applied to incoming events before they reach the sink.
    pub filter: EventFilter,
    /// Event types the subscription covers.
    pub subscribed_events: Vec<WebhookEventType>,
    /// Update this existing subscription instead of creating one.
    pub subscription: Option<SubscriptionId>,
    /// Keep the subscription in place on shutdown.
    pub no_cleanup: bool,
    /// Timeout over connect + registration, per attempt.
    pub handshake_timeout: Duration,
    /// First reconnect delay.
    pub reconnect_initial_delay: Duration,
    /// Cap on the reconnect delay.
    pub reconnect_max_delay: Duration,
}

impl ListenConfig {
    /// Config with defaults: all event types, no filter, standard timeouts.
    pub fn new(
        relay_url: impl Into<String>,
        gateway_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            relay_url: relay_url.into(),
            gateway_url: gateway_url.into(),
            token: token.into(),
            filter: EventFilter::All,
            subscribed_events: WebhookEventType::ALL.to_vec(),
            subscription: None,
            no_cleanup: false,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            reconnect_initial_delay: backoff::DEFAULT_INITIAL_DELAY,
            reconnect_max_delay: backoff::DEFAULT_MAX_DELAY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_events() {
        let cfg = ListenConfig::new("http://localhost:3001", "ws://localhost:3001/gateway", "t");
        assert_eq!(cfg.subscribed_events.len(), 17);
        assert!(cfg.filter.allows(Some("message.sent")));
        assert_eq!(cfg.handshake_timeout, Duration::from_secs(10));
        assert_eq!(cfg.reconnect_initial_delay, Duration::from_millis(1000));
        assert_eq!(cfg.reconnect_max_delay, Duration::from_millis(30_000));
        assert!(!cfg.no_cleanup);
        assert!(cfg.subscription.is_none());
    }
}
