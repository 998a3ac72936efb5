//! Content store trait definition.
//!
//! This module defines the abstract interface to a headless content store exposing CRUD
//! operations over named collections plus a media library.

use async_trait::async_trait;
use content_migrate_shared::RecordId;
use serde_json::Value;

use crate::errors::ContentStoreError;
use crate::types::{ListQuery, MediaUpload, RecordPage, UploadedMedia};

/// Abstracts the remote content store (source or target of a migration).
///
/// Implementations are injected into the exporter, importer and media uploader so the
/// pipeline can run against a live store (`HttpContentStore`) or the in-memory
/// `MockContentStore` in tests.
///
/// All methods return `Result<T, ContentStoreError>`. A payload of unexpected shape is
/// reported as `ContentStoreError::MalformedResponse`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List one page of a collection.
    ///
    /// # Arguments
    ///
    /// * `collection` - Collection name as used in the API path (e.g. `navigation-items`)
    /// * `query` - Relation expansion and pagination options
    ///
    /// # Returns
    ///
    /// * `Ok(RecordPage)` - Items as returned by the store plus pagination metadata
    /// * `Err(ContentStoreError)` - If the request fails or the payload has no item list
    async fn list_records(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<RecordPage, ContentStoreError>;

    /// Delete one record by its identifier.
    async fn delete_record(&self, collection: &str, id: &RecordId)
        -> Result<(), ContentStoreError>;

    /// Create a record from `data` and return the created record, including the
    /// identifier the store assigned.
    async fn create_record(&self, collection: &str, data: &Value)
        -> Result<Value, ContentStoreError>;

    /// Partially update a record: only the fields present in `data` change.
    async fn update_record(
        &self,
        collection: &str,
        id: &RecordId,
        data: &Value,
    ) -> Result<(), ContentStoreError>;

    /// Fetch the full media-asset metadata index.
    async fn list_media(&self) -> Result<Vec<Value>, ContentStoreError>;

    /// Upload one blob to the media library.
    async fn upload_media(&self, upload: &MediaUpload)
        -> Result<UploadedMedia, ContentStoreError>;
}
