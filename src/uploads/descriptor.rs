//! Views over an uploaded attachment
//!
//! The vendor message carries a verbose file descriptor mirroring what its
//! web client sends; activity reports use a compact summary instead.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::UploadedAttachment;

/// File metadata nested in the vendor descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorFileMeta {
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// Inner `file` record of the vendor descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorFileRecord {
    pub created_at: i64,
    pub data: Map<String, Value>,
    pub filename: String,
    pub hash: Option<String>,
    pub id: String,
    pub user_id: String,
    pub meta: VendorFileMeta,
    pub update_at: i64,
}

/// Attachment descriptor as the vendor web client sends it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub file: VendorFileRecord,
    pub id: String,
    pub url: String,
    pub name: String,
    pub collection_name: String,
    pub progress: u8,
    pub status: String,
    #[serde(rename = "greenNet")]
    pub green_net: String,
    pub size: u64,
    pub error: String,
    #[serde(rename = "itemId")]
    pub item_id: String,
    pub file_type: String,
    #[serde(rename = "showType")]
    pub show_type: String,
    pub file_class: String,
    #[serde(rename = "uploadTaskId")]
    pub upload_task_id: String,
}

impl VendorFile {
    /// Descriptor for `attachment` with fresh random identifiers
    pub fn from_attachment(attachment: &UploadedAttachment) -> Self {
        let now = Utc::now().timestamp_millis();
        let is_image = attachment.content_type.starts_with("image/");

        Self {
            kind: attachment.kind.as_str().to_string(),
            file: VendorFileRecord {
                created_at: now,
                data: Map::new(),
                filename: attachment.filename.clone(),
                hash: None,
                id: Uuid::new_v4().to_string(),
                user_id: Uuid::new_v4().to_string(),
                meta: VendorFileMeta {
                    name: attachment.filename.clone(),
                    size: attachment.size_bytes,
                    content_type: attachment.content_type.clone(),
                },
                update_at: now,
            },
            id: Uuid::new_v4().to_string(),
            url: attachment.remote_url.clone(),
            name: attachment.filename.clone(),
            collection_name: String::new(),
            progress: 0,
            status: "uploaded".to_string(),
            green_net: "success".to_string(),
            size: attachment.size_bytes,
            error: String::new(),
            item_id: Uuid::new_v4().to_string(),
            file_type: attachment.content_type.clone(),
            show_type: if is_image { "image" } else { "file" }.to_string(),
            file_class: if is_image { "vision" } else { "document" }.to_string(),
            upload_task_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Compact summary for activity reports
pub fn summary(attachment: &UploadedAttachment) -> Value {
    json!({
        "url": attachment.remote_url,
        "filename": attachment.filename,
        "size": attachment.size_bytes,
        "content_type": attachment.content_type,
        "digest": attachment.digest.short(),
        "cached": attachment.from_cache,
    })
}

/// Last path segment of `url` without its query string
pub fn filename_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = without_query
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(without_query);
    let (_, path) = path.split_once('/')?;
    path.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
