//! Integration tests for the Mirage facade
//!
//! These tests verify the complete request/response flow: client protocol
//! in, vendor session and completions calls out, and the vendor's event
//! stream translated back into the client's format.

mod attachments;
mod chat_completions;
mod models;
mod ollama;
mod sessions;
