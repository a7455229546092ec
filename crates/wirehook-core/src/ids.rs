//! Branded ID newtypes.
//!
//! Ids in the relay are opaque strings minted by someone else: connection
//! ids by the broker, subscription ids by the messaging platform. The
//! newtypes keep them from being mixed up in signatures; none of them can be
//! invented locally, so there is no `new()`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Broker-assigned identifier for one live gateway connection.
    ///
    /// Unique among live connections at any instant; embedded in the webhook
    /// subscription's target URL, so it changes meaning on every reconnect.
    ConnectionId
}

branded_id! {
    /// Platform-assigned identifier for a webhook subscription.
    SubscriptionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_as_str() {
        let id = ConnectionId::from("local-1");
        assert_eq!(id.as_str(), "local-1");
        assert_eq!(id.to_string(), "local-1");
    }

    #[test]
    fn serde_is_transparent() {
        let id = ConnectionId::from("local-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"local-7\"");
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn conversions() {
        let id = SubscriptionId::from("wh_abc123".to_string());
        let s: String = id.clone().into();
        assert_eq!(s, "wh_abc123");
        assert_eq!(id.into_inner(), "wh_abc123");
    }

    #[test]
    fn distinct_types_compare_by_value() {
        let a = ConnectionId::from("x");
        let b = ConnectionId::from("x");
        assert_eq!(a, b);
    }
}
