//! Client-side error taxonomy.
//!
//! Only two conditions terminate a run: an authentication rejection on the
//! very first connection attempt, and a failure to set up the initial
//! subscription. Everything else is absorbed by the reconnect loop or logged
//! as a warning.

use std::time::Duration;

use crate::platform::PlatformError;

/// Errors surfaced by the reconnect controller.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    /// The broker refused the connection's credential token.
    #[error("authentication rejected by broker (close code {code}); check your credential token")]
    AuthRejected {
        /// The WebSocket close code the broker sent.
        code: u16,
    },

    /// The initial subscription could not be created or adopted.
    #[error("failed to set up webhook subscription: {0}")]
    SubscriptionSetup(#[from] PlatformError),

    /// The gateway could not be reached.
    #[error("could not reach broker gateway: {0}")]
    Connect(String),

    /// The registration handshake did not complete in time.
    #[error("timed out after {0:?} waiting for the registration handshake")]
    HandshakeTimeout(Duration),

    /// The gateway connection closed before or during registration.
    #[error("gateway connection closed")]
    ConnectionClosed,
}

impl ListenError {
    /// Whether this is the broker refusing the credential token. Fatal on
    /// the first attempt, retried like any other failure afterwards.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::AuthRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejection_is_classified() {
        assert!(ListenError::AuthRejected { code: 4001 }.is_auth_rejection());
        assert!(!ListenError::ConnectionClosed.is_auth_rejection());
    }

    #[test]
    fn fatal_messages_name_the_condition() {
        let auth = ListenError::AuthRejected { code: 4001 }.to_string();
        assert!(auth.contains("authentication rejected"));
        assert!(auth.contains("4001"));

        let sub = ListenError::SubscriptionSetup(PlatformError::Rejected {
            status: 422,
            body: "bad target".into(),
        })
        .to_string();
        assert!(sub.contains("webhook subscription"));
        assert!(sub.contains("422"));
    }
}
