//! Vendor stream event decoding
//!
//! Each `data:` line of the vendor stream is matched against the known event
//! shapes. Anything that fits none of them is kept verbatim as
//! [`VendorEvent::Unrecognized`] so encoders can pass it through.

use serde::Deserialize;
use serde_json::Value;

use crate::vendor::models::VendorFailure;

/// Reasoning phase of a delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Think,
    Answer,
}

/// Token usage reported by the vendor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct VendorUsage {
    #[serde(default, alias = "prompt_tokens")]
    pub input_tokens: u64,
    #[serde(default, alias = "completion_tokens")]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// One normalized unit of generated output
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedEvent {
    pub role: String,
    pub content_delta: Option<String>,
    pub phase: Phase,
    /// The vendor marked the current phase finished
    pub phase_finished: bool,
    /// A finish reason arrived; no more content follows
    pub done: bool,
    pub done_reason: Option<String>,
    pub usage: Option<VendorUsage>,
}

impl TranslatedEvent {
    /// Non-empty content of this delta
    pub fn content(&self) -> Option<&str> {
        self.content_delta.as_deref().filter(|c| !c.is_empty())
    }
}

/// A decoded vendor stream line
#[derive(Debug, Clone, PartialEq)]
pub enum VendorEvent {
    /// Ids to thread the next turn onto
    ResponseCreated {
        parent_id: Option<String>,
        response_id: Option<String>,
    },
    Delta(TranslatedEvent),
    /// The vendor reported an error mid-stream
    Failure(String),
    /// `[DONE]` sentinel
    Done,
    /// A line that matched no known shape, kept verbatim
    Unrecognized(String),
}

#[derive(Debug, Deserialize)]
struct CreatedPayload {
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    response_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDelta {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    phase: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    #[serde(default)]
    delta: RawDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEvent {
    Created {
        #[serde(rename = "response.created")]
        created: CreatedPayload,
    },
    Chunk {
        choices: Vec<RawChoice>,
        #[serde(default)]
        usage: Option<VendorUsage>,
    },
    Error {
        error: Value,
    },
    Envelope {
        success: bool,
        #[serde(default)]
        data: Option<Value>,
    },
}

impl VendorEvent {
    /// Decode one line of the vendor stream.
    ///
    /// Accepts `data: <json>` lines and bare JSON. Returns `None` for lines
    /// that carry no payload (SSE comments, `event:` fields, empty data).
    pub fn decode(line: &str) -> Option<Self> {
        let line = line.trim_end();
        let payload = match line.strip_prefix("data:") {
            Some(rest) => rest.trim_start(),
            None if line.starts_with(':') || line.starts_with("event:") || line.starts_with("id:") => {
                return None
            }
            None => line,
        };
        if payload.is_empty() {
            return None;
        }
        if payload == "[DONE]" {
            return Some(VendorEvent::Done);
        }

        let raw = match serde_json::from_str::<RawEvent>(payload) {
            Ok(raw) => raw,
            Err(_) => return Some(VendorEvent::Unrecognized(line.to_string())),
        };

        Some(match raw {
            RawEvent::Created { created } => VendorEvent::ResponseCreated {
                parent_id: created.parent_id,
                response_id: created.response_id,
            },
            RawEvent::Chunk { choices, usage } => {
                let choice = choices.into_iter().next();
                let (delta, finish_reason) = match choice {
                    Some(c) => (c.delta, c.finish_reason),
                    None => (RawDelta::default(), None),
                };
                VendorEvent::Delta(TranslatedEvent {
                    role: delta.role.unwrap_or_else(|| "assistant".to_string()),
                    content_delta: delta.content,
                    phase: match delta.phase.as_deref() {
                        Some("think") => Phase::Think,
                        _ => Phase::Answer,
                    },
                    phase_finished: delta.status.as_deref() == Some("finished"),
                    done: finish_reason.is_some(),
                    done_reason: finish_reason,
                    usage,
                })
            }
            RawEvent::Error { error } => VendorEvent::Failure(error_message(&error)),
            RawEvent::Envelope { success: false, data } => {
                let failure: VendorFailure = data
                    .and_then(|d| serde_json::from_value(d).ok())
                    .unwrap_or_default();
                VendorEvent::Failure(failure.message())
            }
            RawEvent::Envelope { success: true, .. } => VendorEvent::Unrecognized(line.to_string()),
        })
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}
