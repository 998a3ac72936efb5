//! Source store exporter.
//!
//! Reads configured collections (with relations expanded) and the media library from a
//! source store and writes them into a snapshot, unchanged.

use std::path::PathBuf;
use std::sync::Arc;

use content_migrate_repository::{ContentStore, ContentStoreError, ListQuery};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::CollectionConfig;
use crate::errors::{MigrationError, SnapshotError};
use crate::media::MEDIA_SECTION;
use crate::report::{SectionReport, Stage};
use crate::snapshot::SnapshotStore;

/// Exports a source store into a snapshot.
pub struct Exporter {
    source: Arc<dyn ContentStore>,
    snapshot: SnapshotStore,
    export_media: bool,
    media_source_dir: Option<PathBuf>,
}

impl Exporter {
    pub fn new(source: Arc<dyn ContentStore>, snapshot: SnapshotStore) -> Self {
        Self {
            source,
            snapshot,
            export_media: true,
            media_source_dir: None,
        }
    }

    /// Enable or disable the media export.
    pub fn with_media(mut self, export_media: bool) -> Self {
        self.export_media = export_media;
        self
    }

    /// Local directory whose blobs are copied into the snapshot.
    pub fn with_media_source_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.media_source_dir = dir;
        self
    }

    /// Export every collection of `collections`, then the media library.
    ///
    /// Only a snapshot directory that cannot be created fails the export. A collection
    /// that cannot be read or written is recorded and the rest still run.
    #[instrument(skip_all, fields(snapshot = %self.snapshot.root().display()))]
    pub async fn export_all(
        &self,
        collections: &[CollectionConfig],
    ) -> Result<Vec<SectionReport>, MigrationError> {
        self.snapshot.ensure_layout().await?;

        let mut sections = Vec::with_capacity(collections.len() + 1);
        for collection in collections {
            let mut section = SectionReport::new(&collection.name);
            match self.export_collection(&collection.name).await {
                Ok(count) => {
                    info!(collection = %collection.name, items = count, "Exported collection");
                    section.record_success(Stage::Export, &collection.name);
                }
                Err(e) => {
                    warn!(collection = %collection.name, error = %e, "Failed to export collection");
                    section.record_failure(Stage::Export, &collection.name, e);
                }
            }
            sections.push(section);
        }

        if self.export_media {
            sections.push(self.export_media_library().await);
        }

        Ok(sections)
    }

    /// Read every page of `collection` with relations expanded and write it to the snapshot.
    ///
    /// Returns the number of exported items.
    pub async fn export_collection(&self, collection: &str) -> Result<usize, MigrationError> {
        let items = self.read_all_pages(collection).await?;
        self.snapshot.write_collection(collection, &items).await?;
        Ok(items.len())
    }

    /// Read pages 1 up to the page count reported with the first page.
    ///
    /// A response for a page other than the requested one, or an empty page after the
    /// first, fails the collection as a malformed response.
    async fn read_all_pages(&self, collection: &str) -> Result<Vec<Value>, MigrationError> {
        let mut items = Vec::new();
        let mut page_number = 1;
        let mut page_count = 1;
        while page_number <= page_count {
            let page = self
                .source
                .list_records(collection, &ListQuery::populated().with_page(page_number))
                .await?;
            debug!(collection = %collection, page = page.page, page_count = page.page_count, "Read page");

            if page.page != page_number {
                return Err(ContentStoreError::malformed(format!(
                    "{}: requested page {} but received page {}",
                    collection, page_number, page.page
                ))
                .into());
            }
            if page_number == 1 {
                page_count = page.page_count.max(1);
            } else if page.items.is_empty() {
                return Err(ContentStoreError::malformed(format!(
                    "{}: page {} of {} is empty",
                    collection, page_number, page_count
                ))
                .into());
            }

            items.extend(page.items);
            page_number += 1;
        }
        Ok(items)
    }

    /// Write the media index and copy local blobs into the snapshot.
    pub async fn export_media_library(&self) -> SectionReport {
        let mut section = SectionReport::new(MEDIA_SECTION);

        match self.source.list_media().await {
            Ok(entries) => match self.snapshot.write_media_index(&entries).await {
                Ok(path) => {
                    info!(entries = entries.len(), path = %path.display(), "Exported media index");
                    section.record_success(Stage::Export, "files.json");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to write media index");
                    section.record_failure(Stage::Export, "files.json", e);
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to read media index");
                section.record_failure(Stage::Export, "files.json", e);
            }
        }

        let Some(dir) = &self.media_source_dir else {
            warn!("No local media directory configured, skipping blob copy");
            section.record_skip(Stage::Export, "uploads", "no local media directory configured");
            return section;
        };

        match self.snapshot.copy_blobs_from(dir).await {
            Ok(copied) => {
                info!(copied, source = %dir.display(), "Copied media blobs");
                section.record_success(Stage::Export, "uploads");
            }
            Err(SnapshotError::NotFound(path)) => {
                warn!(source = %path.display(), "Local media directory does not exist, skipping blob copy");
                section.record_skip(Stage::Export, "uploads", "local media directory does not exist");
            }
            Err(e) => {
                warn!(error = %e, "Failed to copy media blobs");
                section.record_failure(Stage::Export, "uploads", e);
            }
        }

        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use content_migrate_repository::mock::DEFAULT_PAGE_SIZE;
    use content_migrate_repository::{MediaUpload, MockContentStore, RecordPage, UploadedMedia};
    use content_migrate_shared::RecordId;
    use serde_json::json;
    use std::time::Duration;

    /// Source whose listing ignores the requested page or runs dry early.
    struct BrokenPagination {
        /// Answer every request with page 1 of 2.
        stuck_on_first_page: bool,
    }

    #[async_trait]
    impl ContentStore for BrokenPagination {
        async fn list_records(
            &self,
            _collection: &str,
            query: &ListQuery,
        ) -> Result<RecordPage, ContentStoreError> {
            let requested = query.page.unwrap_or(1);
            if self.stuck_on_first_page {
                return Ok(RecordPage {
                    items: vec![json!({"id": 1})],
                    page: 1,
                    page_count: 2,
                });
            }
            Ok(RecordPage {
                items: if requested == 1 { vec![json!({"id": 1})] } else { Vec::new() },
                page: requested,
                page_count: 3,
            })
        }

        async fn delete_record(&self, _: &str, _: &RecordId) -> Result<(), ContentStoreError> {
            Err(ContentStoreError::malformed("read-only"))
        }

        async fn create_record(&self, _: &str, _: &Value) -> Result<Value, ContentStoreError> {
            Err(ContentStoreError::malformed("read-only"))
        }

        async fn update_record(
            &self,
            _: &str,
            _: &RecordId,
            _: &Value,
        ) -> Result<(), ContentStoreError> {
            Err(ContentStoreError::malformed("read-only"))
        }

        async fn list_media(&self) -> Result<Vec<Value>, ContentStoreError> {
            Ok(Vec::new())
        }

        async fn upload_media(&self, _: &MediaUpload) -> Result<UploadedMedia, ContentStoreError> {
            Err(ContentStoreError::malformed("read-only"))
        }
    }

    async fn export_with(source: BrokenPagination) -> Result<usize, MigrationError> {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(Arc::new(source), SnapshotStore::new(dir.path()));
        tokio::time::timeout(Duration::from_secs(5), exporter.export_collection("artikels"))
            .await
            .expect("export should terminate")
    }

    #[tokio::test]
    async fn test_export_fails_when_store_repeats_first_page() {
        let result = export_with(BrokenPagination {
            stuck_on_first_page: true,
        })
        .await;

        assert!(matches!(
            result,
            Err(MigrationError::Store(ContentStoreError::MalformedResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_export_fails_on_empty_later_page() {
        let result = export_with(BrokenPagination {
            stuck_on_first_page: false,
        })
        .await;

        assert!(matches!(
            result,
            Err(MigrationError::Store(ContentStoreError::MalformedResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_export_reads_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        let source = Arc::new(MockContentStore::new());
        let total = DEFAULT_PAGE_SIZE as i64 * 2 + 3;
        source.seed_collection("artikels", (1..=total).map(|i| json!({"id": i})).collect());

        let exporter = Exporter::new(source.clone(), snapshot.clone());
        let count = exporter.export_collection("artikels").await.unwrap();

        let exported = snapshot.read_collection("artikels").await.unwrap();
        assert_eq!(count, total as usize);
        assert_eq!(exported.first(), Some(&json!({"id": 1})));
        assert_eq!(exported.last(), Some(&json!({"id": total})));
    }

    #[tokio::test]
    async fn test_failed_collection_does_not_stop_others() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        let source = Arc::new(MockContentStore::new());
        source.make_unreachable("artikels");
        source.seed_collection("pages", vec![json!({"id": 1, "title": "Home"})]);

        let exporter = Exporter::new(source, snapshot.clone()).with_media(false);
        let sections = exporter
            .export_all(&[CollectionConfig::new("artikels"), CollectionConfig::new("pages")])
            .await
            .unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].failures(Stage::Export), 1);
        assert_eq!(sections[1].successes(Stage::Export), 1);
        assert!(snapshot.read_collection("pages").await.is_ok());
        assert!(snapshot.read_collection("artikels").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_media_export_without_local_dir_skips_copy() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        let source = Arc::new(MockContentStore::new());
        source.seed_media(vec![json!({"id": 1, "hash": "h1", "ext": ".png"})]);

        let exporter = Exporter::new(source, snapshot.clone())
            .with_media_source_dir(Some(dir.path().join("public/uploads")));
        let section = exporter.export_media_library().await;

        assert_eq!(section.successes(Stage::Export), 1);
        assert_eq!(section.skips(Stage::Export), 1);
        assert_eq!(snapshot.read_media_index().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_media_export_copies_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        std::fs::write(uploads.path().join("h1.png"), b"png").unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        let source = Arc::new(MockContentStore::new());
        source.seed_media(vec![json!({"id": 1, "hash": "h1", "ext": ".png"})]);

        let exporter = Exporter::new(source, snapshot.clone())
            .with_media_source_dir(Some(uploads.path().to_path_buf()));
        let section = exporter.export_media_library().await;

        assert_eq!(section.successes(Stage::Export), 2);
        assert!(snapshot.uploads_dir().join("h1.png").is_file());
    }
}
