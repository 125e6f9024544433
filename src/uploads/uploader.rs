//! Attachment upload pipeline
//!
//! decode -> classify -> digest -> cache lookup -> stage to a temp file ->
//! upload -> cache store. Each item yields its own `Result`; one bad
//! attachment never fails the others.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::{StagedFile, UploadBackend};
use super::cache::{ContentDigest, UploadCache};
use super::decode::{decode, AttachmentKind, InlineAttachment};
use super::descriptor::filename_from_url;
use super::media::{classify, MediaType};
use super::AttachmentError;
use crate::routes::metrics;

/// An attachment the vendor can fetch
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAttachment {
    pub kind: AttachmentKind,
    pub remote_url: String,
    pub filename: String,
    pub size_bytes: u64,
    pub content_type: String,
    pub digest: ContentDigest,
    /// True when the URL came from the cache instead of a fresh upload
    pub from_cache: bool,
}

/// Uploads inline attachments through one backend, deduplicated by digest
pub struct AttachmentUploader {
    backend: Arc<dyn UploadBackend>,
    cache: Arc<UploadCache>,
    tmp_dir: PathBuf,
}

impl AttachmentUploader {
    pub fn new(backend: Arc<dyn UploadBackend>, cache: Arc<UploadCache>, tmp_dir: PathBuf) -> Self {
        Self {
            backend,
            cache,
            tmp_dir,
        }
    }

    pub fn cache(&self) -> &Arc<UploadCache> {
        &self.cache
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Upload every item in order, one at a time
    pub async fn upload(
        &self,
        items: &[InlineAttachment],
    ) -> Vec<Result<UploadedAttachment, AttachmentError>> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(self.upload_one(item).await);
        }
        results
    }

    /// Upload a single item, reusing a cached URL for known content
    pub async fn upload_one(
        &self,
        item: &InlineAttachment,
    ) -> Result<UploadedAttachment, AttachmentError> {
        let decoded = decode(item)?;
        let media = classify(&decoded.bytes, decoded.declared_mime.as_deref());
        let digest = ContentDigest::of(&decoded.bytes);
        let size = decoded.bytes.len() as u64;

        if let Some(url) = self.cache.get(&digest) {
            return Ok(self.cache_hit(item.kind, url, &media, size, digest));
        }

        // Another request may be uploading the same bytes right now
        let _flight = self.cache.lock_digest(&digest).await;
        if let Some(url) = self.cache.get(&digest) {
            return Ok(self.cache_hit(item.kind, url, &media, size, digest));
        }
        metrics::record_upload_cache("miss");

        let (temp, staged) = self.stage(item.kind, &media, decoded.bytes).await?;
        let uploaded = self.backend.upload(&staged).await;

        if let Err(e) = temp.close() {
            warn!(path = %staged.path.display(), error = %e, "Failed to remove temporary file");
        }

        let remote_url = match uploaded {
            Ok(url) => {
                metrics::record_upload(self.backend.name(), "success");
                url
            }
            Err(e) => {
                metrics::record_upload(self.backend.name(), "error");
                return Err(e);
            }
        };

        info!(
            kind = item.kind.as_str(),
            digest = %digest.short(),
            size,
            content_type = %media.content_type,
            url = %remote_url,
            "Uploaded attachment"
        );
        self.cache.insert(digest, remote_url.clone());

        Ok(UploadedAttachment {
            kind: item.kind,
            filename: filename_from_url(&remote_url).unwrap_or(staged.filename),
            remote_url,
            size_bytes: size,
            content_type: media.content_type,
            digest,
            from_cache: false,
        })
    }

    fn cache_hit(
        &self,
        kind: AttachmentKind,
        remote_url: String,
        media: &MediaType,
        size: u64,
        digest: ContentDigest,
    ) -> UploadedAttachment {
        metrics::record_upload_cache("hit");
        debug!(digest = %digest.short(), url = %remote_url, "Attachment served from cache");

        let filename = filename_from_url(&remote_url)
            .unwrap_or_else(|| format!("cached_{}.{}", Uuid::new_v4().simple(), media.extension));
        UploadedAttachment {
            kind,
            remote_url,
            filename,
            size_bytes: size,
            content_type: media.content_type.clone(),
            digest,
            from_cache: true,
        }
    }

    /// Write `bytes` to a uniquely named temp file.
    ///
    /// The returned `NamedTempFile` deletes the file when dropped, so every
    /// early return after staging still cleans up.
    async fn stage(
        &self,
        kind: AttachmentKind,
        media: &MediaType,
        bytes: Bytes,
    ) -> Result<(NamedTempFile, StagedFile), AttachmentError> {
        let prefix = format!(
            "{}_{}_",
            kind.as_str().to_uppercase(),
            Utc::now().timestamp_millis()
        );
        let suffix = format!(".{}", media.extension);
        let dir = self.tmp_dir.clone();
        let size = bytes.len() as u64;

        let temp = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
            std::fs::create_dir_all(&dir)?;
            let mut temp = tempfile::Builder::new()
                .prefix(&prefix)
                .suffix(&suffix)
                .tempfile_in(&dir)?;
            temp.write_all(&bytes)?;
            temp.flush()?;
            Ok(temp)
        })
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        let path = temp.path().to_path_buf();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok((
            temp,
            StagedFile {
                path,
                filename,
                content_type: media.content_type.clone(),
                size,
                kind,
            },
        ))
    }
}
