//! Activity reporting
//!
//! Every notable event of a request (routing, trimming, dropped attachments,
//! vendor failures) is handed to an [`ActivitySink`]. The default sink turns
//! reports into structured `tracing` events; deployments with a dashboard can
//! plug in their own.

mod context;

pub use context::RequestContext;

use serde_json::Value;
use tracing::info;

/// String fields longer than this are truncated before reporting
pub const MAX_REPORTED_FIELD_CHARS: usize = 200;

/// Sink for human-readable activity summaries
pub trait ActivitySink: Send + Sync {
    /// Report one activity with a JSON payload
    fn report(&self, summary: &str, payload: &Value);
}

/// Sink that emits each report as a `tracing` event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingActivity;

impl ActivitySink for TracingActivity {
    fn report(&self, summary: &str, payload: &Value) {
        info!(
            target: "mirage::activity",
            summary = %summary,
            payload = %shorten_payload(payload),
            "activity"
        );
    }
}

/// Copy of `payload` with long strings cut down for display.
///
/// Applies recursively, so message contents nested inside arrays are
/// shortened too. Truncated strings end with `...(truncated)`.
pub fn shorten_payload(payload: &Value) -> Value {
    match payload {
        Value::String(s) if s.chars().count() > MAX_REPORTED_FIELD_CHARS => {
            let head: String = s.chars().take(MAX_REPORTED_FIELD_CHARS).collect();
            Value::String(format!("{}...(truncated)", head))
        }
        Value::Array(items) => Value::Array(items.iter().map(shorten_payload).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), shorten_payload(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
