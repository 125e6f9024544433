//! OpenAI server-sent events encoder

use bytes::Bytes;
use chrono::Utc;

use super::event::{Phase, TranslatedEvent, VendorEvent};
use super::{json_frame, StreamEncoder};
use crate::protocol::openai::{Delta, StreamChoice, StreamChunk};

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// `chatcmpl-` followed by 24 hex digits
pub fn completion_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &hex[..24])
}

pub fn sse_done() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

fn sse_error(message: &str) -> Bytes {
    let body = serde_json::json!({
        "error": {
            "message": message,
            "type": "server_error",
            "code": "VENDOR_STREAM_ERROR"
        }
    });
    json_frame("data: ", &body, "\n\n")
}

/// Re-encodes vendor events as `chat.completion.chunk` frames.
///
/// Think-phase content is wrapped in `<think>`/`</think>`. A finish reason
/// ends the stream with `[DONE]`; everything after that is dropped.
pub struct OpenAiEncoder {
    id: String,
    model: String,
    created: i64,
    role_sent: bool,
    in_think: bool,
    done: bool,
}

impl OpenAiEncoder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: completion_id(),
            model: model.into(),
            created: Utc::now().timestamp(),
            role_sent: false,
            in_think: false,
            done: false,
        }
    }

    fn chunk(&mut self, content: Option<&str>, finish_reason: Option<String>) -> Bytes {
        let role = if self.role_sent {
            None
        } else {
            self.role_sent = true;
            Some("assistant".to_string())
        };
        let chunk = StreamChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            system_fingerprint: self.model.clone(),
            choices: vec![StreamChoice {
                index: 0,
                delta: Delta {
                    role,
                    content: content.map(str::to_string),
                },
                logprobs: None,
                finish_reason,
            }],
        };
        json_frame("data: ", &chunk, "\n\n")
    }

    fn delta(&mut self, event: &TranslatedEvent) -> Vec<Bytes> {
        let mut frames = Vec::new();

        match event.phase {
            Phase::Think => {
                if !self.in_think {
                    self.in_think = true;
                    frames.push(self.chunk(Some(THINK_OPEN), None));
                }
                if let Some(content) = event.content() {
                    frames.push(self.chunk(Some(content), None));
                }
                if event.phase_finished {
                    self.in_think = false;
                    frames.push(self.chunk(Some(THINK_CLOSE), None));
                }
            }
            Phase::Answer => {
                if self.in_think {
                    self.in_think = false;
                    frames.push(self.chunk(Some(THINK_CLOSE), None));
                }
                if let Some(content) = event.content() {
                    frames.push(self.chunk(Some(content), None));
                }
            }
        }

        if event.done {
            if self.in_think {
                self.in_think = false;
                frames.push(self.chunk(Some(THINK_CLOSE), None));
            }
            frames.push(self.chunk(None, event.done_reason.clone()));
            frames.push(sse_done());
            self.done = true;
        }

        frames
    }
}

impl StreamEncoder for OpenAiEncoder {
    fn encode(&mut self, event: &VendorEvent) -> Vec<Bytes> {
        if self.done {
            return Vec::new();
        }
        match event {
            VendorEvent::ResponseCreated { .. } => Vec::new(),
            VendorEvent::Delta(delta) => self.delta(delta),
            VendorEvent::Failure(message) => {
                self.done = true;
                vec![sse_error(message), sse_done()]
            }
            VendorEvent::Done => {
                self.done = true;
                vec![sse_done()]
            }
            VendorEvent::Unrecognized(raw) => vec![Bytes::from(format!("{}\n\n", raw))],
        }
    }

    fn finish(&mut self) -> Vec<Bytes> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        vec![sse_done()]
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
