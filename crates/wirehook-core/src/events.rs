//! The webhook event-type universe.
//!
//! The platform pushes a fixed, enumerated set of event types. Requesting a
//! subscription for a name outside this set is a caller-side validation
//! error, reported before anything reaches the platform.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every event type the platform can deliver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEventType {
    #[serde(rename = "message.sent")]
    MessageSent,
    #[serde(rename = "message.received")]
    MessageReceived,
    #[serde(rename = "message.read")]
    MessageRead,
    #[serde(rename = "message.delivered")]
    MessageDelivered,
    #[serde(rename = "message.failed")]
    MessageFailed,
    #[serde(rename = "reaction.added")]
    ReactionAdded,
    #[serde(rename = "reaction.removed")]
    ReactionRemoved,
    #[serde(rename = "participant.added")]
    ParticipantAdded,
    #[serde(rename = "participant.removed")]
    ParticipantRemoved,
    #[serde(rename = "chat.created")]
    ChatCreated,
    #[serde(rename = "chat.group_name_updated")]
    ChatGroupNameUpdated,
    #[serde(rename = "chat.group_icon_updated")]
    ChatGroupIconUpdated,
    #[serde(rename = "chat.group_name_update_failed")]
    ChatGroupNameUpdateFailed,
    #[serde(rename = "chat.group_icon_update_failed")]
    ChatGroupIconUpdateFailed,
    #[serde(rename = "chat.typing_indicator.started")]
    TypingIndicatorStarted,
    #[serde(rename = "chat.typing_indicator.stopped")]
    TypingIndicatorStopped,
    #[serde(rename = "phonenumber.status_updated")]
    PhoneNumberStatusUpdated,
}

impl WebhookEventType {
    /// All event types, in wire order.
    pub const ALL: [WebhookEventType; 17] = [
        Self::MessageSent,
        Self::MessageReceived,
        Self::MessageRead,
        Self::MessageDelivered,
        Self::MessageFailed,
        Self::ReactionAdded,
        Self::ReactionRemoved,
        Self::ParticipantAdded,
        Self::ParticipantRemoved,
        Self::ChatCreated,
        Self::ChatGroupNameUpdated,
        Self::ChatGroupIconUpdated,
        Self::ChatGroupNameUpdateFailed,
        Self::ChatGroupIconUpdateFailed,
        Self::TypingIndicatorStarted,
        Self::TypingIndicatorStopped,
        Self::PhoneNumberStatusUpdated,
    ];

    /// The wire name of this event type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MessageSent => "message.sent",
            Self::MessageReceived => "message.received",
            Self::MessageRead => "message.read",
            Self::MessageDelivered => "message.delivered",
            Self::MessageFailed => "message.failed",
            Self::ReactionAdded => "reaction.added",
            Self::ReactionRemoved => "reaction.removed",
            Self::ParticipantAdded => "participant.added",
            Self::ParticipantRemoved => "participant.removed",
            Self::ChatCreated => "chat.created",
            Self::ChatGroupNameUpdated => "chat.group_name_updated",
            Self::ChatGroupIconUpdated => "chat.group_icon_updated",
            Self::ChatGroupNameUpdateFailed => "chat.group_name_update_failed",
            Self::ChatGroupIconUpdateFailed => "chat.group_icon_update_failed",
            Self::TypingIndicatorStarted => "chat.typing_indicator.started",
            Self::TypingIndicatorStopped => "chat.typing_indicator.stopped",
            Self::PhoneNumberStatusUpdated => "phonenumber.status_updated",
        }
    }
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event-type name outside the enumerated universe.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid event type `{name}`; valid events: {}", valid_names())]
pub struct UnknownEventType {
    /// The rejected name.
    pub name: String,
}

fn valid_names() -> String {
    WebhookEventType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for WebhookEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType { name: s.to_owned() })
    }
}

/// Parse a comma-separated list of event-type names (`"message.received,
/// message.sent"`). Whitespace around names is ignored; empty segments are
/// skipped.
pub fn parse_event_list(list: &str) -> Result<Vec<WebhookEventType>, UnknownEventType> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(WebhookEventType::from_str)
        .collect()
}

/// Allow-list over incoming events.
///
/// Filtering happens on the raw `event_type` field of a forwarded event;
/// events that carry no such field always pass.
#[derive(Clone, Debug, Default)]
pub enum EventFilter {
    /// Emit everything.
    #[default]
    All,
    /// Emit only events whose type is in the list.
    Only(Vec<WebhookEventType>),
}

impl EventFilter {
    /// Build a filter from an explicit allow-list.
    #[must_use]
    pub fn only(types: Vec<WebhookEventType>) -> Self {
        Self::Only(types)
    }

    /// Whether an event with the given `event_type` field should be emitted.
    #[must_use]
    pub fn allows(&self, event_type: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Only(allowed) => match event_type {
                None => true,
                Some(name) => allowed.iter().any(|t| t.as_str() == name),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_names_round_trip() {
        for event_type in WebhookEventType::ALL {
            let parsed: WebhookEventType = event_type.as_str().parse().unwrap();
            assert_eq!(parsed, event_type);
        }
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&WebhookEventType::MessageReceived).unwrap();
        assert_eq!(json, "\"message.received\"");
        let back: WebhookEventType =
            serde_json::from_str("\"chat.typing_indicator.started\"").unwrap();
        assert_eq!(back, WebhookEventType::TypingIndicatorStarted);
    }

    #[test]
    fn unknown_name_lists_valid_events() {
        let err = "invalid.event".parse::<WebhookEventType>().unwrap_err();
        assert_eq!(err.name, "invalid.event");
        let message = err.to_string();
        assert!(message.contains("invalid.event"));
        assert!(message.contains("message.received"));
        assert!(message.contains("phonenumber.status_updated"));
    }

    #[test]
    fn universe_has_seventeen_types() {
        assert_eq!(WebhookEventType::ALL.len(), 17);
    }

    #[test]
    fn parse_event_list_trims_and_skips_empty() {
        let parsed = parse_event_list(" message.received , message.sent ,").unwrap();
        assert_eq!(
            parsed,
            vec![
                WebhookEventType::MessageReceived,
                WebhookEventType::MessageSent
            ]
        );
    }

    #[test]
    fn parse_event_list_rejects_unknown() {
        let err = parse_event_list("message.received,bogus").unwrap_err();
        assert_eq!(err.name, "bogus");
    }

    #[test]
    fn filter_all_allows_everything() {
        let filter = EventFilter::All;
        assert!(filter.allows(Some("message.sent")));
        assert!(filter.allows(Some("not.a.real.type")));
        assert!(filter.allows(None));
    }

    #[test]
    fn filter_only_drops_non_members() {
        let filter = EventFilter::only(vec![WebhookEventType::MessageReceived]);
        assert!(filter.allows(Some("message.received")));
        assert!(!filter.allows(Some("message.sent")));
    }

    #[test]
    fn filter_passes_events_without_a_type() {
        let filter = EventFilter::only(vec![WebhookEventType::MessageReceived]);
        assert!(filter.allows(None));
    }
}
