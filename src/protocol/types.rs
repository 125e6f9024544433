//! Message types shared by the OpenAI-style and Ollama-style surfaces
//!
//! Both client protocols carry a list of `{role, content}` messages; Ollama
//! adds per-message `images`/`files`. Non-standard roles (`prompt`,
//! `template`) come from the Ollama `generate` mapping.

use serde::{Deserialize, Serialize};

/// Role of a message participant
///
/// Unknown roles are kept as [`Role::Other`] so that a request carrying them
/// still deserializes; translation skips them later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    /// Ollama `generate` prompt
    Prompt,
    /// Ollama `generate` template
    Template,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Prompt => "prompt",
            Role::Template => "template",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "prompt" => Role::Prompt,
            "template" => Role::Template,
            _ => Role::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image URL reference for multimodal content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    /// URL of the image (data URL or HTTP URL)
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A part of multimodal content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    /// Audio, files and anything else the vendor cannot take
    #[serde(other)]
    Unsupported,
}

/// Message content - either plain text or multimodal parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Extract text content from either variant
    ///
    /// For `Parts`, only text parts contribute, concatenated in order.
    pub fn as_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Inline `data:` image URLs carried as `image_url` parts
    pub fn inline_images(&self) -> Vec<&str> {
        match self {
            Content::Text(_) => Vec::new(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::ImageUrl { image_url } if image_url.url.starts_with("data:") => {
                        Some(image_url.url.as_str())
                    }
                    _ => None,
                })
                .collect(),
        }
    }
}

/// A single value or a list of them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }
}

/// A chat message with role, content and optional inline attachments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<Content>,
    /// Ollama-style base64 images attached to this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<OneOrMany<String>>,
    /// Base64 or data-URL files attached to this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<OneOrMany<String>>,
}

impl ChatMessage {
    /// Plain text message without attachments
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(Content::Text(text.into())),
            images: None,
            files: None,
        }
    }

    /// Text of the message; empty when there is no content
    pub fn text(&self) -> String {
        self.content.as_ref().map(Content::as_text).unwrap_or_default()
    }
}
