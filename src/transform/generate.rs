//! Ollama `/api/generate` shaping
//!
//! Generate output is produced by running chat-shaped lines through
//! [`rewrite_generate_line`]. Each line is classified once into a
//! [`GenerateLine`]; lines that fit no shape are forwarded untouched.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::VendorEvent;
use super::ollama::{OllamaChatEncoder, Timings};
use super::StreamEncoder;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChatLineMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// A chat-shaped object to be mapped onto the generate shape
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChatLine {
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub message: Option<ChatLineMessage>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(flatten)]
    pub timings: Timings,
}

/// Classification of one upstream line
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateLine {
    /// Already generate-shaped (`response` key)
    Generate(Map<String, Value>),
    /// Carries an `error` key
    Error(Map<String, Value>),
    Chat(ChatLine),
    Unrecognized(String),
}

impl GenerateLine {
    pub fn parse(line: &str) -> Self {
        let map = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => map,
            _ => return GenerateLine::Unrecognized(line.to_string()),
        };
        if map.contains_key("response") {
            return GenerateLine::Generate(map);
        }
        if map.contains_key("error") {
            return GenerateLine::Error(map);
        }
        match serde_json::from_value::<ChatLine>(Value::Object(map)) {
            Ok(chat) => GenerateLine::Chat(chat),
            Err(_) => GenerateLine::Unrecognized(line.to_string()),
        }
    }
}

/// One `/api/generate` object
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateChunk {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    pub context: Value,
    #[serde(flatten)]
    pub timings: Timings,
}

impl GenerateChunk {
    fn from_chat(chat: ChatLine, model: &str) -> Self {
        Self {
            model: model.to_string(),
            created_at: chat.created_at,
            response: chat.message.and_then(|m| m.content),
            done: chat.done,
            done_reason: chat.done_reason,
            context: chat.context.unwrap_or_else(|| Value::Array(Vec::new())),
            timings: chat.timings,
        }
    }
}

/// Rewrite one line of chat-shaped NDJSON into the generate shape.
///
/// Generate-shaped lines only get `model` replaced, error lines and
/// unparseable lines are returned as they came.
pub fn rewrite_generate_line(line: &str, model: &str) -> String {
    match GenerateLine::parse(line) {
        GenerateLine::Generate(mut map) => {
            map.insert("model".to_string(), Value::String(model.to_string()));
            Value::Object(map).to_string()
        }
        GenerateLine::Error(_) | GenerateLine::Unrecognized(_) => line.to_string(),
        GenerateLine::Chat(chat) => serde_json::to_string(&GenerateChunk::from_chat(chat, model))
            .unwrap_or_else(|_| line.to_string()),
    }
}

/// Map one aggregated chat object onto a final generate object.
///
/// `done` is always true and `done_reason` defaults to `stop`. Objects
/// without a string `message.content` come back unchanged.
pub fn to_generate_response(chat: &Value, model: &str) -> Value {
    let Some(content) = chat.pointer("/message/content").and_then(Value::as_str) else {
        return chat.clone();
    };
    let Ok(line) = serde_json::from_value::<ChatLine>(chat.clone()) else {
        return chat.clone();
    };

    let chunk = GenerateChunk {
        response: Some(content.to_string()),
        done: Some(true),
        done_reason: Some(line.done_reason.clone().unwrap_or_else(|| "stop".to_string())),
        ..GenerateChunk::from_chat(line, model)
    };
    serde_json::to_value(chunk).unwrap_or_else(|_| chat.clone())
}

/// Chat encoder whose output lines are rewritten into the generate shape
pub struct GenerateEncoder {
    inner: OllamaChatEncoder,
    model: String,
}

impl GenerateEncoder {
    pub fn new(model: impl Into<String>, prompt_tokens: u64) -> Self {
        let model = model.into();
        Self {
            inner: OllamaChatEncoder::new(model.clone(), prompt_tokens),
            model,
        }
    }

    fn rewrite(&self, frames: Vec<Bytes>) -> Vec<Bytes> {
        frames
            .into_iter()
            .map(|frame| {
                let text = String::from_utf8_lossy(&frame);
                let line = text.strip_suffix('\n').unwrap_or(text.as_ref());
                Bytes::from(format!("{}\n", rewrite_generate_line(line, &self.model)))
            })
            .collect()
    }
}

impl StreamEncoder for GenerateEncoder {
    fn encode(&mut self, event: &VendorEvent) -> Vec<Bytes> {
        let frames = self.inner.encode(event);
        self.rewrite(frames)
    }

    fn finish(&mut self) -> Vec<Bytes> {
        let frames = self.inner.finish();
        self.rewrite(frames)
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }
}
