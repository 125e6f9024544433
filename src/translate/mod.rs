//! OpenAI-style request to vendor request translation
//!
//! The vendor accepts one user turn per call, so the whole conversation is
//! flattened into a single message: every known role becomes a labelled,
//! fenced line. History is trimmed to the model's context budget first, and
//! inline attachments are uploaded and referenced by URL.

pub mod tools;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, warn};

use crate::activity::ActivitySink;
use crate::protocol::{ChatCompletionRequest, ChatMessage, Role};
use crate::routes::metrics;
use crate::tokens::{BudgetInfo, ContextBudgeter};
use crate::uploads::descriptor::summary;
use crate::uploads::{
    AttachmentKind, AttachmentPayload, AttachmentUploader, InlineAttachment, UploadedAttachment,
    VendorFile,
};
use crate::vendor::models::CHAT_MODE;
use crate::vendor::{ModelCatalog, VendorChatRequest, VendorMessage};

pub use tools::{attach_tools, render_tools};

/// Label a role is flattened under; `None` for roles the vendor prompt has no
/// place for.
pub fn role_label(role: &Role) -> Option<&'static str> {
    match role {
        Role::System => Some("System"),
        Role::User => Some("User"),
        Role::Assistant | Role::Template => Some("Assistant"),
        Role::Prompt => Some("Prompt"),
        Role::Other(_) => None,
    }
}

/// Flatten `messages` into one fenced transcript.
///
/// Returns the transcript and the roles that were skipped.
pub fn flatten(messages: &[ChatMessage]) -> (String, Vec<String>) {
    let mut combined = String::new();
    let mut skipped = Vec::new();

    for message in messages {
        match role_label(&message.role) {
            Some(label) => {
                combined.push_str("```\n");
                combined.push_str(label);
                combined.push_str(": ");
                combined.push_str(&message.text());
                combined.push_str("\n```\n");
            }
            None => skipped.push(message.role.to_string()),
        }
    }

    (combined, skipped)
}

/// Inline attachments carried by a request, in request order.
///
/// Request-level images come first, then each message's images, files and
/// `data:` image parts.
pub fn gather_attachments(
    images: Option<&[String]>,
    messages: &[ChatMessage],
) -> Vec<InlineAttachment> {
    let mut items: Vec<InlineAttachment> = images
        .unwrap_or_default()
        .iter()
        .map(|data| InlineAttachment::encoded(AttachmentKind::Image, data.clone()))
        .collect();

    for message in messages {
        if let Some(images) = &message.images {
            items.extend(
                images
                    .iter()
                    .map(|data| InlineAttachment::encoded(AttachmentKind::Image, data.clone())),
            );
        }
        if let Some(files) = &message.files {
            items.extend(
                files
                    .iter()
                    .map(|data| InlineAttachment::encoded(AttachmentKind::File, data.clone())),
            );
        }
        if let Some(content) = &message.content {
            items.extend(
                content
                    .inline_images()
                    .into_iter()
                    .map(|url| InlineAttachment::encoded(AttachmentKind::Image, url)),
            );
        }
    }

    items.retain(|item| match &item.payload {
        AttachmentPayload::Encoded(data) => !data.trim().is_empty(),
        AttachmentPayload::Raw(bytes) => !bytes.is_empty(),
    });
    items
}

/// Result of one translation
#[derive(Debug, Clone)]
pub struct Translation {
    pub request: VendorChatRequest,
    pub budget: BudgetInfo,
    pub attachments: Vec<UploadedAttachment>,
    /// Roles left out of the transcript
    pub skipped_roles: Vec<String>,
}

pub struct RequestTranslator {
    budgeter: ContextBudgeter,
    uploader: Arc<AttachmentUploader>,
    catalog: Arc<ModelCatalog>,
    activity: Arc<dyn ActivitySink>,
    body_version: String,
}

impl RequestTranslator {
    pub fn new(
        uploader: Arc<AttachmentUploader>,
        catalog: Arc<ModelCatalog>,
        activity: Arc<dyn ActivitySink>,
        body_version: impl Into<String>,
    ) -> Self {
        Self {
            budgeter: ContextBudgeter::new(),
            uploader,
            catalog,
            activity,
            body_version: body_version.into(),
        }
    }

    /// Build the vendor request for `request` inside chat `chat_id`.
    ///
    /// Never fails: unknown roles and bad attachments are reported and left
    /// out. `request.model` must already be resolved.
    pub async fn translate(
        &self,
        request: &ChatCompletionRequest,
        chat_id: &str,
        parent_id: Option<String>,
    ) -> Translation {
        let model = request.model.as_str();
        let mut messages = request.messages.clone();

        if let Some(tools) = request.tools.as_deref() {
            if attach_tools(&mut messages, tools) {
                debug!(tools = tools.len(), "Rendered tool catalogue into prompt");
            }
        }

        // Attachments ride along even when their message is trimmed away
        let items = gather_attachments(request.images.as_deref(), &messages);

        let context_limit = self.catalog.context_length(model).await;
        let (messages, budget) = self.budgeter.budget(messages, context_limit);
        self.report_budget(model, &budget);

        let (content, skipped_roles) = flatten(&messages);
        for role in &skipped_roles {
            warn!(role = %role, "Skipping message with unknown role");
            self.activity
                .report("Unknown role skipped", &json!({ "role": role, "model": model }));
        }

        let attachments = self.upload(items).await;
        let files = attachments.iter().map(VendorFile::from_attachment).collect();

        let vendor_request = VendorChatRequest {
            stream: request.stream,
            incremental_output: request.stream,
            version: self.body_version.clone(),
            chat_id: chat_id.to_string(),
            chat_mode: CHAT_MODE.to_string(),
            model: model.to_string(),
            parent_id: parent_id.clone(),
            messages: vec![VendorMessage::user(content, model, parent_id, files)],
            timestamp: Utc::now().timestamp(),
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
        };

        Translation {
            request: vendor_request,
            budget,
            attachments,
            skipped_roles,
        }
    }

    async fn upload(&self, items: Vec<InlineAttachment>) -> Vec<UploadedAttachment> {
        if items.is_empty() {
            return Vec::new();
        }

        let mut uploaded = Vec::with_capacity(items.len());
        for (index, result) in self.uploader.upload(&items).await.into_iter().enumerate() {
            match result {
                Ok(attachment) => {
                    self.activity.report("Attachment ready", &summary(&attachment));
                    uploaded.push(attachment);
                }
                Err(e) => {
                    warn!(index, stage = e.stage(), error = %e, "Attachment skipped");
                    self.activity.report(
                        "Attachment skipped",
                        &json!({
                            "index": index,
                            "kind": items[index].kind.as_str(),
                            "stage": e.stage(),
                            "error": e.to_string(),
                        }),
                    );
                }
            }
        }
        uploaded
    }

    fn report_budget(&self, model: &str, budget: &BudgetInfo) {
        if let Some(error) = &budget.error {
            warn!(model, error = %error, "Context budgeting skipped");
            self.activity
                .report("Context budgeting skipped", &json!({ "model": model, "info": budget }));
        } else if budget.trimmed {
            metrics::record_context_trimmed();
            self.activity
                .report("Context trimmed", &json!({ "model": model, "info": budget }));
        }
    }
}
