//! Client-facing wire types
//!
//! - [`types`] - messages shared by both surfaces
//! - [`openai`] - OpenAI-style requests, responses and stream chunks
//! - [`ollama`] - Ollama-style requests and their mapping to chat requests

pub mod ollama;
pub mod openai;
pub mod types;

pub use openai::ChatCompletionRequest;
pub use types::{ChatMessage, Content, ContentPart, OneOrMany, Role};
