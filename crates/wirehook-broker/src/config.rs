//! Broker configuration.

use serde::{Deserialize, Serialize};

/// Configuration for one broker instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Per-connection send queue depth.
    pub max_send_queue: usize,
    /// Prefix for broker-assigned connection ids.
    pub id_prefix: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_send_queue: 256,
            id_prefix: "local-".into(),
        }
    }
}
