//! Event output: where forwarded events end up.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Where the controller emits events that pass the filter.
///
/// `raw` is the exact text the broker forwarded; `event` is its parsed form.
pub trait EventSink: Send + Sync {
    fn emit(&self, raw: &str, event: &Value);
}

/// Output format for [`StdoutSink`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// One formatted log line per event.
    #[default]
    Text,
    /// The raw forwarded JSON, one line per event.
    Json,
}

/// Prints events to stdout, one line per event.
pub struct StdoutSink {
    mode: OutputMode,
}

impl StdoutSink {
    #[must_use]
    pub fn new(mode: OutputMode) -> Self {
        Self { mode }
    }
}

impl EventSink for StdoutSink {
    fn emit(&self, raw: &str, event: &Value) {
        match self.mode {
            OutputMode::Json => println!("{raw}"),
            OutputMode::Text => println!("{}", format_log_line(event)),
        }
    }
}

/// Forwards parsed events over a channel; the receiving side is usually a
/// test assertion.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<Value>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, _raw: &str, event: &Value) {
        let _ = self.tx.send(event.clone());
    }
}

const MAX_STRING_LEN: usize = 80;

/// One-line rendering of an event:
/// `<timestamp> [<event_type>] data.from="+15551234567" data.message.id="msg_1"`.
pub fn format_log_line(event: &Value) -> String {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let event_type = event
        .get("event_type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    let mut pairs = Vec::new();
    if let Value::Object(map) = event {
        flatten_into(map, "", &mut pairs);
    }

    if pairs.is_empty() {
        format!("{timestamp} [{event_type}]")
    } else {
        format!("{timestamp} [{event_type}] {}", pairs.join(" "))
    }
}

/// Flatten an event object into dotted `key=value` pairs.
///
/// The `event_type` key is skipped (it is already in the line header), nulls
/// are skipped, arrays of scalars are inlined, arrays of objects collapse to
/// their length, and strings are quoted and truncated.
fn flatten_into(map: &serde_json::Map<String, Value>, prefix: &str, pairs: &mut Vec<String>) {
    for (key, value) in map {
        if key == "event_type" {
            continue;
        }
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Null => {}
            Value::Object(nested) => flatten_into(nested, &full_key, pairs),
            Value::Array(items) if items.is_empty() => pairs.push(format!("{full_key}=[]")),
            Value::Array(items) if items[0].is_object() => {
                pairs.push(format!("{full_key}=[{}]", items.len()));
            }
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                pairs.push(format!("{full_key}=[{joined}]"));
            }
            Value::String(s) => {
                pairs.push(format!("{full_key}=\"{}\"", truncate(s, MAX_STRING_LEN)));
            }
            other => pairs.push(format!("{full_key}={other}")),
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(max_len - 3).collect();
    out.push_str("...");
    out
}
