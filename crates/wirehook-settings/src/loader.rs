//! Settings loading with deep merge and environment variable overrides.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::WirehookSettings;

/// Resolve the path to the settings file (`~/.wirehook/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".wirehook").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<WirehookSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file means defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<WirehookSettings> {
    let defaults = serde_json::to_value(WirehookSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: WirehookSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are silently ignored, falling back to file/default.
fn apply_env_overrides(settings: &mut WirehookSettings) {
    if let Some(v) = read_env_string("WIREHOOK_RELAY_URL") {
        settings.relay_url = v;
    }
    if let Some(v) = read_env_string("WIREHOOK_GATEWAY_URL") {
        settings.gateway_url = v;
    }
    if let Some(v) = read_env_string("WIREHOOK_TOKEN") {
        settings.token = Some(v);
    }
    if let Some(v) = read_env_string("WIREHOOK_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = read_env_string("WIREHOOK_BROKER_HOST") {
        settings.broker.host = v;
    }
    if let Some(v) = read_env_u16("WIREHOOK_BROKER_PORT", 1, 65535) {
        settings.broker.port = v;
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|v| (min..=max).contains(v))
}
