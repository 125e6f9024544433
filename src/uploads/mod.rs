//! Attachment uploads
//!
//! Client attachments arrive inline (data URLs or base64). The vendor only
//! accepts attachments by URL, so each one is uploaded to a blob endpoint
//! first. Uploads are deduplicated per chat session by content digest.
//!
//! - [`decode`] - inline payload decoding
//! - [`media`] - extension and content type classification
//! - [`cache`] - digest to URL cache with single-flight locking
//! - [`backend`] - anonymous host and signed-URL transports
//! - [`uploader`] - the per-item pipeline
//! - [`descriptor`] - vendor descriptor and summary views

pub mod backend;
pub mod cache;
pub mod decode;
pub mod descriptor;
pub mod media;
pub mod uploader;

use thiserror::Error;

pub use backend::{AnonymousHostBackend, SignedUrlBackend, StagedFile, UploadBackend};
pub use cache::{ContentDigest, UploadCache};
pub use decode::{AttachmentKind, AttachmentPayload, InlineAttachment};
pub use descriptor::VendorFile;
pub use uploader::{AttachmentUploader, UploadedAttachment};

/// Why a single attachment was dropped
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Attachment decode failed: {0}")]
    Decode(String),

    #[error("Temporary file error: {0}")]
    Write(#[from] std::io::Error),

    #[error("Attachment upload failed: {0}")]
    Upload(String),
}

impl AttachmentError {
    /// Pipeline stage that failed, for reports
    pub fn stage(&self) -> &'static str {
        match self {
            AttachmentError::Decode(_) => "decode",
            AttachmentError::Write(_) => "write",
            AttachmentError::Upload(_) => "upload",
        }
    }
}
