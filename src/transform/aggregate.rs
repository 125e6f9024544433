//! Non-streaming responses
//!
//! The vendor always streams; non-streaming clients get the whole stream
//! folded into one object.

use chrono::Utc;

use super::event::{Phase, VendorEvent, VendorUsage};
use super::ollama::{created_at, ChatFrame, FrameMessage, TimingClock};
use super::openai::{completion_id, THINK_CLOSE, THINK_OPEN};
use crate::protocol::openai::{ChatCompletionResponse, Choice, ChoiceMessage, Usage};
use crate::tokens::estimate_tokens;

/// Everything gathered from one vendor stream
#[derive(Debug)]
pub struct Aggregate {
    pub content: String,
    pub thinking: String,
    pub finish_reason: Option<String>,
    pub usage: Option<VendorUsage>,
    /// First error the vendor reported, if any
    pub failure: Option<String>,
    clock: TimingClock,
}

impl Default for Aggregate {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregate {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            thinking: String::new(),
            finish_reason: None,
            usage: None,
            failure: None,
            clock: TimingClock::start(),
        }
    }

    pub fn apply(&mut self, event: &VendorEvent) {
        match event {
            VendorEvent::Delta(delta) => {
                if let Some(content) = delta.content() {
                    self.clock.mark_output();
                    match delta.phase {
                        Phase::Think => self.thinking.push_str(content),
                        Phase::Answer => self.content.push_str(content),
                    }
                }
                if delta.usage.is_some() {
                    self.usage = delta.usage;
                }
                if delta.done && self.finish_reason.is_none() {
                    self.finish_reason = delta.done_reason.clone();
                }
            }
            VendorEvent::Failure(message) => {
                self.failure.get_or_insert_with(|| message.clone());
            }
            VendorEvent::Unrecognized(_) | VendorEvent::ResponseCreated { .. } | VendorEvent::Done => {}
        }
    }

    /// True when the vendor failed before producing any output
    pub fn failed_empty(&self) -> bool {
        self.failure.is_some() && self.content.is_empty() && self.thinking.is_empty()
    }

    fn generated(&self) -> String {
        format!("{}{}", self.thinking, self.content)
    }

    /// OpenAI `chat.completion`; reasoning is wrapped in think tags
    pub fn into_openai(self, model: &str, prompt_tokens: u64) -> ChatCompletionResponse {
        let content = if self.thinking.is_empty() {
            self.content.clone()
        } else {
            format!("{}{}{}{}", THINK_OPEN, self.thinking, THINK_CLOSE, self.content)
        };

        let usage = match self.usage {
            Some(u) if u.input_tokens > 0 || u.output_tokens > 0 => {
                Usage::new(u.input_tokens, u.output_tokens)
            }
            _ => {
                let generated = self.generated();
                let completion = if generated.is_empty() { 0 } else { estimate_tokens(&generated) };
                Usage::new(prompt_tokens, completion)
            }
        };

        ChatCompletionResponse {
            id: completion_id(),
            object: "chat.completion".to_string(),
            created: Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![Choice {
                index: 0,
                message: ChoiceMessage {
                    role: "assistant".to_string(),
                    content,
                },
                finish_reason: Some(self.finish_reason.unwrap_or_else(|| "stop".to_string())),
            }],
            usage,
        }
    }

    /// Ollama `/api/chat` object with `done: true`
    pub fn into_ollama_chat(self, model: &str, prompt_tokens: u64) -> ChatFrame {
        let timings = self
            .clock
            .timings(prompt_tokens, &self.generated(), self.usage);
        ChatFrame {
            model: model.to_string(),
            created_at: created_at(),
            message: FrameMessage {
                role: "assistant".to_string(),
                content: Some(self.content),
                thinking: Some(self.thinking).filter(|t| !t.is_empty()),
            },
            done_reason: Some(self.finish_reason.unwrap_or_else(|| "stop".to_string())),
            done: true,
            timings,
        }
    }
}
