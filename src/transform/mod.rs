//! Vendor response transformation
//!
//! - [`event`] - decoding vendor stream lines into [`VendorEvent`]s
//! - [`openai`] - OpenAI SSE chunks
//! - [`ollama`] - Ollama `/api/chat` NDJSON
//! - [`generate`] - Ollama `/api/generate` line rewriting
//! - [`aggregate`] - folding a whole stream for non-streaming clients
//!
//! Encoders hold per-request state only. Each is driven line by line and
//! knows when its output is complete.

pub mod aggregate;
pub mod event;
pub mod generate;
pub mod ollama;
pub mod openai;

pub use aggregate::Aggregate;
pub use event::{Phase, TranslatedEvent, VendorEvent, VendorUsage};
pub use generate::{rewrite_generate_line, to_generate_response, GenerateEncoder};
pub use ollama::{ChatFrame, OllamaChatEncoder, Timings};
pub use openai::OpenAiEncoder;

use bytes::Bytes;
use serde::Serialize;
use tracing::error;

/// Re-encodes decoded vendor events into one client wire format
pub trait StreamEncoder: Send {
    /// Frames to emit for one event
    fn encode(&mut self, event: &VendorEvent) -> Vec<Bytes>;

    /// Frames to emit once the vendor transport has closed
    fn finish(&mut self) -> Vec<Bytes>;

    /// Whether the client-facing stream is complete
    fn is_done(&self) -> bool;
}

pub(crate) fn json_frame<T: Serialize>(prefix: &str, value: &T, suffix: &str) -> Bytes {
    match serde_json::to_string(value) {
        Ok(json) => Bytes::from(format!("{}{}{}", prefix, json, suffix)),
        Err(e) => {
            error!(error = %e, "Failed to serialize stream frame");
            Bytes::new()
        }
    }
}
