//! Shared vocabulary for the wirehook relay tunnel.
//!
//! Both halves of the tunnel — the broker and the listening client — speak
//! in terms of the types defined here: branded ids, the gateway wire
//! protocol, the webhook event-type universe, and reconnect backoff state.

pub mod backoff;
pub mod events;
pub mod ids;
pub mod protocol;

pub use backoff::ReconnectBackoff;
pub use events::{EventFilter, UnknownEventType, WebhookEventType};
pub use ids::{ConnectionId, SubscriptionId};
