//! Settings types.

use serde::{Deserialize, Serialize};

/// Broker section of the settings file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// Host the broker binds.
    pub host: String,
    /// Port the broker binds.
    pub port: u16,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3001,
        }
    }
}

/// Root settings document (`~/.wirehook/settings.json`).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WirehookSettings {
    /// Broker HTTP base URL; subscription target URLs are built from it.
    pub relay_url: String,
    /// Broker WebSocket gateway URL.
    pub gateway_url: String,
    /// Platform API token.
    pub token: Option<String>,
    /// Platform API base URL.
    pub api_url: String,
    /// Broker bind settings.
    pub broker: BrokerSettings,
}

impl Default for WirehookSettings {
    fn default() -> Self {
        Self {
            relay_url: "http://localhost:3001".into(),
            gateway_url: "ws://localhost:3001/gateway".into(),
            token: None,
            api_url: "https://api.wirehook.app/partner".into(),
            broker: BrokerSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_broker() {
        let settings = WirehookSettings::default();
        assert_eq!(settings.relay_url, "http://localhost:3001");
        assert_eq!(settings.gateway_url, "ws://localhost:3001/gateway");
        assert!(settings.token.is_none());
        assert_eq!(settings.broker.port, 3001);
    }

    #[test]
    fn partial_document_fills_in_defaults() {
        let settings: WirehookSettings =
            serde_json::from_str(r#"{"token":"tok_123"}"#).unwrap();
        assert_eq!(settings.token.as_deref(), Some("tok_123"));
        assert_eq!(settings.relay_url, "http://localhost:3001");
    }

    #[test]
    fn serde_uses_camel_case() {
        let settings = WirehookSettings::default();
        let json = serde_json::to_value(&settings).unwrap();
        assert!(json.get("relayUrl").is_some());
        assert!(json.get("gatewayUrl").is_some());
        assert!(json.get("apiUrl").is_some());
    }
}
