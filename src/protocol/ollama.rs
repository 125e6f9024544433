//! Ollama-style request types and their mapping onto the OpenAI-style request
//!
//! The facade translates everything into a [`ChatCompletionRequest`] first,
//! so the rest of the pipeline only deals with one request shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::openai::ChatCompletionRequest;
use super::types::{ChatMessage, Role};

const LATEST_SUFFIX: &str = ":latest";

fn default_true() -> bool {
    true
}

/// Strip the `:latest` tag Ollama clients append to model names
pub fn strip_latest(model: &str) -> &str {
    model.strip_suffix(LATEST_SUFFIX).unwrap_or(model)
}

/// Add the `:latest` tag for model listings
pub fn with_latest(model: &str) -> String {
    format!("{}{}", strip_latest(model), LATEST_SUFFIX)
}

/// `POST /api/generate` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GenerateRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub options: Option<Value>,
    #[serde(default)]
    pub suffix: Option<String>,
    /// Accepted and ignored; the vendor has no structured output switch
    #[serde(default)]
    pub format: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(default)]
    pub keep_alive: Option<Value>,
    #[serde(default)]
    pub raw: Option<bool>,
}

impl GenerateRequest {
    /// Map onto a chat request: system, prompt and template become messages
    /// with their own roles, in that order.
    pub fn into_chat_request(self) -> ChatCompletionRequest {
        let mut messages = Vec::new();
        for (role, text) in [
            (Role::System, self.system),
            (Role::Prompt, self.prompt),
            (Role::Template, self.template),
        ] {
            if let Some(text) = text.filter(|t| !t.is_empty()) {
                messages.push(ChatMessage::new(role, text));
            }
        }

        let sampling = Sampling::from_options(self.options.as_ref());
        ChatCompletionRequest {
            model: strip_latest(&self.model).to_string(),
            messages,
            stream: self.stream,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_tokens,
            tools: None,
            images: self.images.filter(|images| !images.is_empty()),
        }
    }
}

/// `POST /api/chat` body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    #[serde(default)]
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub tools: Option<Vec<Value>>,
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(default)]
    pub options: Option<Value>,
    /// Accepted and ignored, as on `generate`
    #[serde(default)]
    pub format: Option<Value>,
    #[serde(default)]
    pub keep_alive: Option<Value>,
}

impl ChatRequest {
    pub fn into_chat_request(self) -> ChatCompletionRequest {
        let sampling = Sampling::from_options(self.options.as_ref());
        ChatCompletionRequest {
            model: strip_latest(&self.model).to_string(),
            messages: self.messages,
            stream: self.stream,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_tokens,
            tools: self.tools.filter(|tools| !tools.is_empty()),
            images: None,
        }
    }
}

/// `POST /api/show` body
#[derive(Debug, Clone, Deserialize)]
pub struct ShowRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ShowRequest {
    pub fn model_id(&self) -> &str {
        let name = self
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.model.as_deref())
            .unwrap_or_default();
        strip_latest(name)
    }
}

/// Sampling values pulled out of an Ollama `options` object
#[derive(Debug, Default, PartialEq)]
struct Sampling {
    temperature: Option<f64>,
    top_p: Option<f64>,
    max_tokens: Option<u32>,
}

impl Sampling {
    fn from_options(options: Option<&Value>) -> Self {
        let Some(options) = options else {
            return Self::default();
        };
        Self {
            temperature: options.get("temperature").and_then(Value::as_f64),
            top_p: options.get("top_p").and_then(Value::as_f64),
            max_tokens: options
                .get("num_predict")
                .and_then(Value::as_i64)
                .filter(|n| *n > 0)
                .and_then(|n| u32::try_from(n).ok()),
        }
    }
}
