//! Per-request orchestration behind both client protocols
//!
//! Every chat-like request goes through the same steps: resolve the model,
//! obtain a vendor session, translate, open the vendor stream, then either
//! relay it or fold it into one object. Only the session policy and the
//! encoder differ between entry points.

mod relay;

pub use relay::FrameStream;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::activity::{ActivitySink, RequestContext};
use crate::error::{AppError, AppResult};
use crate::protocol::ollama::strip_latest;
use crate::protocol::ChatCompletionRequest;
use crate::routes::metrics;
use crate::transform::{
    to_generate_response, GenerateEncoder, OllamaChatEncoder, OpenAiEncoder, StreamEncoder,
};
use crate::translate::RequestTranslator;
use crate::vendor::{SessionManager, VendorApi};

use relay::Relay;

/// Client entry point a request arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    OpenAiChat,
    OllamaChat,
    OllamaGenerate,
}

impl Surface {
    pub fn endpoint(self) -> &'static str {
        match self {
            Surface::OpenAiChat => "/v1/chat/completions",
            Surface::OllamaChat => "/api/chat",
            Surface::OllamaGenerate => "/api/generate",
        }
    }

    /// OpenAI clients share one long-lived vendor chat; Ollama requests
    /// each start a fresh one.
    fn shares_session(self) -> bool {
        matches!(self, Surface::OpenAiChat)
    }

    fn encoder(self, model: &str, prompt_tokens: u64) -> Box<dyn StreamEncoder> {
        match self {
            Surface::OpenAiChat => Box::new(OpenAiEncoder::new(model)),
            Surface::OllamaChat => Box::new(OllamaChatEncoder::new(model, prompt_tokens)),
            Surface::OllamaGenerate => Box::new(GenerateEncoder::new(model, prompt_tokens)),
        }
    }
}

/// What a handler sends back to the client
pub enum Reply {
    Stream(FrameStream),
    Complete(Value),
}

impl std::fmt::Debug for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Stream(_) => f.write_str("Reply::Stream"),
            Reply::Complete(value) => f.debug_tuple("Reply::Complete").field(value).finish(),
        }
    }
}

pub struct ProtocolFacade {
    translator: Arc<RequestTranslator>,
    sessions: Arc<SessionManager>,
    vendor: Arc<dyn VendorApi>,
    activity: Arc<dyn ActivitySink>,
    default_model: String,
}

impl ProtocolFacade {
    pub fn new(
        translator: Arc<RequestTranslator>,
        sessions: Arc<SessionManager>,
        vendor: Arc<dyn VendorApi>,
        activity: Arc<dyn ActivitySink>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            translator,
            sessions,
            vendor,
            activity,
            default_model: default_model.into(),
        }
    }

    /// Model id to use for `requested`: `:latest` stripped, empty means default
    pub fn resolve_model(&self, requested: &str) -> String {
        let model = strip_latest(requested.trim());
        if model.is_empty() {
            self.default_model.clone()
        } else {
            model.to_string()
        }
    }

    /// Serve one chat-like request arriving on `surface`
    pub async fn complete(
        &self,
        mut request: ChatCompletionRequest,
        surface: Surface,
    ) -> AppResult<Reply> {
        request.model = self.resolve_model(&request.model);
        let ctx = RequestContext::new(surface.endpoint())
            .with_model(request.model.clone())
            .with_streaming(request.stream);
        ctx.log_request_start();

        let result = self.run(request, surface, ctx.clone()).await;

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_request(
            surface.endpoint(),
            status,
            ctx.start_time.elapsed().as_secs_f64(),
        );
        if let Err(e) = &result {
            ctx.log_error(&e.to_string());
        }
        result
    }

    async fn run(
        &self,
        request: ChatCompletionRequest,
        surface: Surface,
        ctx: RequestContext,
    ) -> AppResult<Reply> {
        let model = request.model.clone();

        let (chat_id, parent_id) = match self.open_session(&model, surface).await {
            Ok(session) => session,
            Err(e) => {
                self.activity.report(
                    "Session creation failed",
                    &json!({ "model": model, "endpoint": surface.endpoint(), "error": e.to_string() }),
                );
                return Err(e);
            }
        };
        let ctx = ctx.with_session(chat_id.clone());

        let translation = self.translator.translate(&request, &chat_id, parent_id).await;
        let mut vendor_request = translation.request;
        vendor_request.force_stream();
        ctx.log_translated(
            vendor_request.message().map(|m| m.content.len()).unwrap_or(0),
            translation.attachments.len(),
        );

        let prompt_tokens = translation
            .budget
            .trimmed_tokens
            .unwrap_or(translation.budget.current_tokens);

        let upstream = match self.vendor.open_completion(&vendor_request).await {
            Ok(upstream) => upstream,
            Err(e) => {
                self.activity.report(
                    "Vendor request failed",
                    &json!({ "model": model, "chat_id": chat_id, "error": e.to_string() }),
                );
                return Err(e);
            }
        };

        let relay = Relay {
            ctx: ctx.clone(),
            activity: self.activity.clone(),
            threading: surface
                .shares_session()
                .then(|| (self.sessions.clone(), chat_id.clone())),
        };

        if request.stream {
            let encoder = surface.encoder(&model, prompt_tokens);
            return Ok(Reply::Stream(relay.stream(upstream, encoder)));
        }

        let aggregate = relay.collect(upstream).await?;
        if aggregate.failed_empty() {
            let message = aggregate.failure.unwrap_or_default();
            return Err(AppError::Vendor(message));
        }
        ctx.log_request_complete(aggregate.content.len());

        let value = match surface {
            Surface::OpenAiChat => serde_json::to_value(aggregate.into_openai(&model, prompt_tokens))?,
            Surface::OllamaChat => {
                serde_json::to_value(aggregate.into_ollama_chat(&model, prompt_tokens))?
            }
            Surface::OllamaGenerate => {
                let chat = serde_json::to_value(aggregate.into_ollama_chat(&model, prompt_tokens))?;
                to_generate_response(&chat, &model)
            }
        };
        Ok(Reply::Complete(value))
    }

    async fn open_session(
        &self,
        model: &str,
        surface: Surface,
    ) -> AppResult<(String, Option<String>)> {
        if surface.shares_session() {
            let state = self.sessions.current_or_new(model).await?;
            debug!(chat_id = %state.chat_id, parent_id = ?state.parent_id, "Using shared session");
            Ok((state.chat_id, state.parent_id))
        } else {
            let chat_id = self.sessions.new_session(model).await?;
            Ok((chat_id, None))
        }
    }
}
