//! Ollama NDJSON encoder for `/api/chat`
//!
//! Frames carry either `content` or `thinking`. The final frame has
//! `done: true` plus timing counters measured while the stream was relayed.

use std::time::Instant;

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::event::{Phase, TranslatedEvent, VendorEvent, VendorUsage};
use super::{json_frame, StreamEncoder};
use crate::tokens::estimate_tokens;

/// Ollama-style RFC 3339 timestamp in UTC
pub fn created_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Timing and counter fields, all durations in nanoseconds
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

/// Wall clock for one relayed response
#[derive(Debug, Clone, Copy)]
pub struct TimingClock {
    started: Instant,
    first_output: Option<Instant>,
}

impl TimingClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            first_output: None,
        }
    }

    /// Note that generated output arrived
    pub fn mark_output(&mut self) {
        self.first_output.get_or_insert_with(Instant::now);
    }

    /// Counters for the response so far.
    ///
    /// Prompt evaluation spans until the first output; evaluation is the rest.
    /// Vendor-reported usage wins over local estimates.
    pub fn timings(&self, prompt_tokens: u64, generated: &str, usage: Option<VendorUsage>) -> Timings {
        let total = self.started.elapsed();
        let prompt = self
            .first_output
            .map(|t| t.duration_since(self.started))
            .unwrap_or(total);

        let (prompt_eval_count, eval_count) = match usage {
            Some(u) if u.input_tokens > 0 || u.output_tokens > 0 => (u.input_tokens, u.output_tokens),
            _ => (
                prompt_tokens,
                if generated.is_empty() { 0 } else { estimate_tokens(generated) },
            ),
        };

        Timings {
            total_duration: Some(total.as_nanos() as u64),
            load_duration: None,
            prompt_eval_count: Some(prompt_eval_count),
            prompt_eval_duration: Some(prompt.as_nanos() as u64),
            eval_count: Some(eval_count),
            eval_duration: Some(total.saturating_sub(prompt).as_nanos() as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

/// One `/api/chat` object, streamed or aggregated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatFrame {
    pub model: String,
    pub created_at: String,
    pub message: FrameMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    pub done: bool,
    #[serde(flatten)]
    pub timings: Timings,
}

impl ChatFrame {
    pub fn partial(model: &str, content: Option<String>, thinking: Option<String>) -> Self {
        Self {
            model: model.to_string(),
            created_at: created_at(),
            message: FrameMessage {
                role: "assistant".to_string(),
                content,
                thinking,
            },
            done_reason: None,
            done: false,
            timings: Timings::default(),
        }
    }

    pub fn last(model: &str, done_reason: &str, timings: Timings) -> Self {
        Self {
            done_reason: Some(done_reason.to_string()),
            done: true,
            timings,
            ..Self::partial(model, Some(String::new()), None)
        }
    }
}

pub struct OllamaChatEncoder {
    model: String,
    prompt_tokens: u64,
    clock: TimingClock,
    generated: String,
    usage: Option<VendorUsage>,
    in_think: bool,
    done: bool,
}

impl OllamaChatEncoder {
    pub fn new(model: impl Into<String>, prompt_tokens: u64) -> Self {
        Self {
            model: model.into(),
            prompt_tokens,
            clock: TimingClock::start(),
            generated: String::new(),
            usage: None,
            in_think: false,
            done: false,
        }
    }

    fn frame(&self, frame: &ChatFrame) -> Bytes {
        json_frame("", frame, "\n")
    }

    fn final_frame(&mut self, done_reason: &str) -> Bytes {
        self.done = true;
        let timings = self
            .clock
            .timings(self.prompt_tokens, &self.generated, self.usage);
        self.frame(&ChatFrame::last(&self.model, done_reason, timings))
    }

    fn delta(&mut self, event: &TranslatedEvent) -> Vec<Bytes> {
        let mut frames = Vec::new();
        if event.usage.is_some() {
            self.usage = event.usage;
        }

        match event.phase {
            Phase::Think => {
                if !self.in_think {
                    self.in_think = true;
                    frames.push(self.frame(&ChatFrame::partial(&self.model, None, Some(String::new()))));
                }
                if let Some(content) = event.content() {
                    self.clock.mark_output();
                    self.generated.push_str(content);
                    let frame = ChatFrame::partial(&self.model, None, Some(content.to_string()));
                    frames.push(self.frame(&frame));
                }
                if event.phase_finished {
                    self.in_think = false;
                }
            }
            Phase::Answer => {
                self.in_think = false;
                if let Some(content) = event.content() {
                    self.clock.mark_output();
                    self.generated.push_str(content);
                    let frame = ChatFrame::partial(&self.model, Some(content.to_string()), None);
                    frames.push(self.frame(&frame));
                }
            }
        }

        if event.done {
            let reason = event.done_reason.as_deref().unwrap_or("stop").to_string();
            frames.push(self.final_frame(&reason));
        }
        frames
    }
}

impl StreamEncoder for OllamaChatEncoder {
    fn encode(&mut self, event: &VendorEvent) -> Vec<Bytes> {
        if self.done {
            return Vec::new();
        }
        match event {
            VendorEvent::ResponseCreated { .. } => Vec::new(),
            VendorEvent::Delta(delta) => self.delta(delta),
            VendorEvent::Failure(message) => {
                self.done = true;
                let body = serde_json::json!({ "error": message });
                vec![json_frame("", &body, "\n")]
            }
            VendorEvent::Done => vec![self.final_frame("stop")],
            VendorEvent::Unrecognized(raw) => vec![Bytes::from(format!("{}\n", raw))],
        }
    }

    fn finish(&mut self) -> Vec<Bytes> {
        Vec::new()
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
