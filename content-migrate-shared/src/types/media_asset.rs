//! Media asset metadata.
//!
//! Mirrors the subset of an entry of the store's media index (`GET /upload/files`)
//! that the migration needs. Unknown fields are ignored on read; the snapshot keeps the
//! full index verbatim, this type is only a typed view over it.

use serde::{Deserialize, Serialize};

use crate::types::record_id::RecordId;

/// One uploaded binary blob as described by the media index.
///
/// # Fields
///
/// - `id`: Source-side file identifier
/// - `content_hash`: Digest of the blob bytes, used as the deduplication key
/// - `file_extension`: Extension including the leading dot (e.g. `.png`)
/// - `name`: Original file name, if the store reports one
/// - `mime`: MIME type, if the store reports one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaAsset {
    pub id: RecordId,
    #[serde(rename = "hash")]
    pub content_hash: String,
    #[serde(rename = "ext", default)]
    pub file_extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl MediaAsset {
    /// File name of the blob inside the snapshot's upload directory.
    ///
    /// # Example
    ///
    /// ```
    /// use content_migrate_shared::{MediaAsset, RecordId};
    ///
    /// let asset = MediaAsset {
    ///     id: RecordId::Numeric(1),
    ///     content_hash: "logo_a1b2".to_string(),
    ///     file_extension: ".png".to_string(),
    ///     name: None,
    ///     mime: None,
    /// };
    /// assert_eq!(asset.blob_file_name(), "logo_a1b2.png");
    /// ```
    pub fn blob_file_name(&self) -> String {
        format!("{}{}", self.content_hash, self.file_extension)
    }

    /// Name to send with the upload, falling back to the blob file name.
    pub fn upload_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.blob_file_name())
    }
}
