//! Inline attachment decoding
//!
//! Clients send attachments as `data:<mime>;base64,<payload>` URLs, as bare
//! base64, or (programmatically) as raw bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use super::AttachmentError;

/// What the attachment is presented as to the vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    File,
}

impl AttachmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::File => "file",
        }
    }
}

/// Attachment payload as received from the client
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentPayload {
    /// Data URL or bare base64 text
    Encoded(String),
    /// Already-decoded bytes
    Raw(Bytes),
}

/// A client-supplied attachment, consumed once per request
#[derive(Debug, Clone, PartialEq)]
pub struct InlineAttachment {
    pub kind: AttachmentKind,
    pub payload: AttachmentPayload,
    /// Mime type known ahead of decoding, if any
    pub mime_hint: Option<String>,
}

impl InlineAttachment {
    /// Attachment from a data URL or base64 string
    pub fn encoded(kind: AttachmentKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            payload: AttachmentPayload::Encoded(data.into()),
            mime_hint: None,
        }
    }

    /// Attachment from raw bytes
    pub fn raw(kind: AttachmentKind, bytes: impl Into<Bytes>, mime_hint: Option<String>) -> Self {
        Self {
            kind,
            payload: AttachmentPayload::Raw(bytes.into()),
            mime_hint,
        }
    }
}

/// Decoded attachment bytes plus the mime declared alongside them
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAttachment {
    pub bytes: Bytes,
    pub declared_mime: Option<String>,
}

/// Decode an inline attachment into bytes.
///
/// A data URL's mime type takes precedence over the attachment's hint.
pub fn decode(attachment: &InlineAttachment) -> Result<DecodedAttachment, AttachmentError> {
    let (bytes, declared_mime) = match &attachment.payload {
        AttachmentPayload::Raw(bytes) => (bytes.clone(), attachment.mime_hint.clone()),
        AttachmentPayload::Encoded(text) => {
            let text = text.trim();
            match parse_data_url(text) {
                Some((mime, payload)) => {
                    let mime = mime.or_else(|| attachment.mime_hint.clone());
                    (decode_base64(payload)?, mime)
                }
                None if text.starts_with("data:") => {
                    return Err(AttachmentError::Decode(
                        "data URL is not base64 encoded".to_string(),
                    ))
                }
                None => (decode_base64(text)?, attachment.mime_hint.clone()),
            }
        }
    };

    if bytes.is_empty() {
        return Err(AttachmentError::Decode("attachment is empty".to_string()));
    }

    Ok(DecodedAttachment {
        bytes,
        declared_mime,
    })
}

/// Split `data:<mime>[;params];base64,<payload>` into mime and payload
fn parse_data_url(text: &str) -> Option<(Option<String>, &str)> {
    let rest = text.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mut params = header.split(';');
    let mime = params.next().map(str::trim).filter(|m| !m.is_empty());
    if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
        return None;
    }
    Some((mime.map(str::to_string), payload))
}

fn decode_base64(payload: &str) -> Result<Bytes, AttachmentError> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(cleaned.as_bytes())
        .map(Bytes::from)
        .map_err(|e| AttachmentError::Decode(format!("invalid base64: {}", e)))
}
