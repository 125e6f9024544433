//! Remote upload transports
//!
//! A deployment picks exactly one backend. Both receive the same staged
//! temporary file and return the durable URL the vendor can fetch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{AttachmentError, AttachmentKind};
use crate::vendor::HeaderSource;

/// User agent the anonymous host expects from command-line clients
const CURL_USER_AGENT: &str = "curl/8.5.0";

/// Attachment bytes persisted to a temporary file, ready for upload
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub path: PathBuf,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub kind: AttachmentKind,
}

/// A remote blob endpoint
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Short backend name for logs and metrics
    fn name(&self) -> &'static str;

    /// Upload the staged file and return its durable URL
    async fn upload(&self, file: &StagedFile) -> Result<String, AttachmentError>;
}

fn upload_error(context: &str, err: impl std::fmt::Display) -> AttachmentError {
    AttachmentError::Upload(format!("{}: {}", context, err))
}

// =============================================================================
// Anonymous file host
// =============================================================================

/// Anonymous public file host (0x0.st style): multipart POST, the response
/// body is the file URL.
pub struct AnonymousHostBackend {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl AnonymousHostBackend {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl UploadBackend for AnonymousHostBackend {
    fn name(&self) -> &'static str {
        "anonymous"
    }

    #[instrument(skip(self, file), fields(filename = %file.filename, size = file.size))]
    async fn upload(&self, file: &StagedFile) -> Result<String, AttachmentError> {
        let bytes = tokio::fs::read(&file.path).await?;
        let part = Part::bytes(bytes)
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| upload_error("invalid content type", e))?;

        let response = self
            .client
            .post(&self.url)
            .header(USER_AGENT, CURL_USER_AGENT)
            .header(ACCEPT, "*/*")
            .multipart(Form::new().part("file", part))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| upload_error("file host unreachable", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| upload_error("failed to read file host response", e))?;

        if status != StatusCode::OK {
            return Err(AttachmentError::Upload(format!(
                "file host returned {}: {}",
                status,
                body.trim()
            )));
        }

        let url = body.trim();
        if !url.starts_with("http") {
            return Err(AttachmentError::Upload(format!(
                "file host returned no URL: {}",
                url
            )));
        }

        debug!(url = %url, "Uploaded to file host");
        Ok(url.to_string())
    }
}

// =============================================================================
// Vendor signed-URL object storage
// =============================================================================

#[derive(Debug, Serialize)]
struct UploadGrantRequest<'a> {
    filename: &'a str,
    filesize: u64,
    filetype: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadGrantResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadGrant>,
}

#[derive(Debug, Deserialize)]
struct UploadGrant {
    /// Durable URL of the object once written
    file_url: String,
    /// Pre-signed PUT URL; absent when `file_url` itself is writable
    #[serde(default)]
    upload_url: Option<String>,
}

/// Vendor object storage: request a signed upload grant, then PUT the bytes.
pub struct SignedUrlBackend {
    client: reqwest::Client,
    grant_url: String,
    headers: Arc<dyn HeaderSource>,
    timeout: Duration,
}

impl SignedUrlBackend {
    pub fn new(
        client: reqwest::Client,
        vendor_api_url: &str,
        headers: Arc<dyn HeaderSource>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            grant_url: format!("{}/v1/files/getstsToken", vendor_api_url),
            headers,
            timeout,
        }
    }

    async fn request_grant(&self, file: &StagedFile) -> Result<UploadGrant, AttachmentError> {
        let response = self
            .client
            .post(&self.grant_url)
            .headers(self.headers.headers())
            .json(&UploadGrantRequest {
                filename: &file.filename,
                filesize: file.size,
                filetype: file.kind.as_str(),
            })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| upload_error("upload grant request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AttachmentError::Upload(format!(
                "upload grant returned {}: {}",
                status, text
            )));
        }

        let grant: UploadGrantResponse = response
            .json()
            .await
            .map_err(|e| upload_error("malformed upload grant", e))?;

        match grant {
            UploadGrantResponse {
                success: true,
                data: Some(grant),
            } => Ok(grant),
            _ => Err(AttachmentError::Upload(
                "vendor refused the upload grant".to_string(),
            )),
        }
    }
}

#[async_trait]
impl UploadBackend for SignedUrlBackend {
    fn name(&self) -> &'static str {
        "signed-url"
    }

    #[instrument(skip(self, file), fields(filename = %file.filename, size = file.size))]
    async fn upload(&self, file: &StagedFile) -> Result<String, AttachmentError> {
        let grant = self.request_grant(file).await?;
        let bytes = tokio::fs::read(&file.path).await?;

        let target = grant.upload_url.as_deref().unwrap_or(&grant.file_url);
        let response = self
            .client
            .put(target)
            .header(CONTENT_TYPE, &file.content_type)
            .body(bytes)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| upload_error("object storage unreachable", e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AttachmentError::Upload(format!(
                "object storage returned {}: {}",
                status, text
            )));
        }

        debug!(url = %grant.file_url, "Uploaded to vendor object storage");
        Ok(grant.file_url)
    }
}
