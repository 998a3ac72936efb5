//! On-disk snapshot of a content store.
//!
//! Layout below the snapshot root:
//!
//! ```text
//! collections/{name}.json   items of one collection, as the source store returned them
//! media/files.json          media-asset metadata index
//! media/uploads/{hash}{ext} one file per distinct blob
//! ```

use std::path::{Path, PathBuf};

use content_migrate_shared::MediaAsset;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::errors::SnapshotError;

pub const COLLECTIONS_DIR: &str = "collections";
pub const MEDIA_DIR: &str = "media";
pub const MEDIA_INDEX_FILE: &str = "files.json";
pub const UPLOADS_DIR: &str = "uploads";

/// Handle on a snapshot directory.
///
/// Cheap to clone; it only holds the root path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `collection`.
    pub fn collection_path(&self, collection: &str) -> Result<PathBuf, SnapshotError> {
        validate_collection_name(collection)?;
        Ok(self
            .root
            .join(COLLECTIONS_DIR)
            .join(format!("{}.json", collection)))
    }

    pub fn media_index_path(&self) -> PathBuf {
        self.root.join(MEDIA_DIR).join(MEDIA_INDEX_FILE)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(MEDIA_DIR).join(UPLOADS_DIR)
    }

    /// Path of the blob file for `asset`, named `{hash}{ext}`.
    pub fn blob_path(&self, asset: &MediaAsset) -> PathBuf {
        self.uploads_dir().join(asset.blob_file_name())
    }

    /// Create the directory structure if absent. Existing content is left untouched.
    pub async fn ensure_layout(&self) -> Result<(), SnapshotError> {
        for dir in [self.root.join(COLLECTIONS_DIR), self.uploads_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| SnapshotError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Write the items of `collection`, replacing any previous export of it.
    pub async fn write_collection(
        &self,
        collection: &str,
        items: &[Value],
    ) -> Result<PathBuf, SnapshotError> {
        let path = self.collection_path(collection)?;
        write_json(&path, items).await?;
        debug!(collection = %collection, path = %path.display(), items = items.len(), "Wrote collection");
        Ok(path)
    }

    /// Read the items of `collection` in exported order.
    ///
    /// Returns [`SnapshotError::NotFound`] when the collection was never exported.
    pub async fn read_collection(&self, collection: &str) -> Result<Vec<Value>, SnapshotError> {
        let path = self.collection_path(collection)?;
        read_json(&path).await
    }

    /// Write the media index verbatim.
    pub async fn write_media_index(&self, entries: &[Value]) -> Result<PathBuf, SnapshotError> {
        let path = self.media_index_path();
        write_json(&path, entries).await?;
        Ok(path)
    }

    /// Read the media index as typed assets.
    ///
    /// Entries without an identifier or content hash cannot be uploaded or referenced
    /// and are skipped with a warning.
    pub async fn read_media_index(&self) -> Result<Vec<MediaAsset>, SnapshotError> {
        let entries: Vec<Value> = read_json(&self.media_index_path()).await?;
        let mut assets = Vec::with_capacity(entries.len());
        for (position, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<MediaAsset>(entry) {
                Ok(asset) => assets.push(asset),
                Err(e) => warn!(position, error = %e, "Skipping unusable media index entry"),
            }
        }
        Ok(assets)
    }

    /// Copy every regular file of `source_dir` byte-for-byte into the upload directory.
    ///
    /// Returns the number of files copied, or [`SnapshotError::NotFound`] when
    /// `source_dir` does not exist.
    pub async fn copy_blobs_from(&self, source_dir: &Path) -> Result<usize, SnapshotError> {
        let mut entries = fs::read_dir(source_dir)
            .await
            .map_err(|e| SnapshotError::io(source_dir, e))?;
        let uploads = self.uploads_dir();
        fs::create_dir_all(&uploads)
            .await
            .map_err(|e| SnapshotError::io(&uploads, e))?;

        let mut copied = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SnapshotError::io(source_dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| SnapshotError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }

            let destination = uploads.join(entry.file_name());
            fs::copy(entry.path(), &destination)
                .await
                .map_err(|e| SnapshotError::io(entry.path(), e))?;
            copied += 1;
        }

        Ok(copied)
    }

    /// Read the blob bytes of `asset`.
    pub async fn read_blob(&self, asset: &MediaAsset) -> Result<Vec<u8>, SnapshotError> {
        let path = self.blob_path(asset);
        fs::read(&path).await.map_err(|e| SnapshotError::io(&path, e))
    }
}

/// Collection names become file names, so they must be a single path component.
fn validate_collection_name(collection: &str) -> Result<(), SnapshotError> {
    let valid = !collection.is_empty()
        && collection != "."
        && collection != ".."
        && !collection.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(SnapshotError::InvalidName(collection.to_string()))
    }
}

async fn write_json(path: &Path, items: &[Value]) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| SnapshotError::io(parent, e))?;
    }
    let bytes = serde_json::to_vec_pretty(items).map_err(|e| SnapshotError::json(path, e))?;

    // Write next to the target and rename, so a crash never leaves a truncated file.
    let partial = path.with_extension("json.partial");
    fs::write(&partial, bytes)
        .await
        .map_err(|e| SnapshotError::io(&partial, e))?;
    fs::rename(&partial, path)
        .await
        .map_err(|e| SnapshotError::io(path, e))
}

async fn read_json(path: &Path) -> Result<Vec<Value>, SnapshotError> {
    let bytes = fs::read(path).await.map_err(|e| SnapshotError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| SnapshotError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_migrate_shared::RecordId;
    use serde_json::json;

    fn asset(hash: &str, ext: &str) -> MediaAsset {
        MediaAsset {
            id: RecordId::Numeric(1),
            content_hash: hash.to_string(),
            file_extension: ext.to_string(),
            name: None,
            mime: None,
        }
    }

    #[test]
    fn test_layout_paths() {
        let snapshot = SnapshotStore::new("/tmp/export");

        assert_eq!(
            snapshot.collection_path("navigation-items").unwrap(),
            PathBuf::from("/tmp/export/collections/navigation-items.json")
        );
        assert_eq!(
            snapshot.media_index_path(),
            PathBuf::from("/tmp/export/media/files.json")
        );
        assert_eq!(
            snapshot.blob_path(&asset("logo_ab12", ".png")),
            PathBuf::from("/tmp/export/media/uploads/logo_ab12.png")
        );
    }

    #[test]
    fn test_rejects_path_like_collection_names() {
        let snapshot = SnapshotStore::new("/tmp/export");

        for name in ["", "..", "a/b", "..\\x"] {
            assert!(matches!(
                snapshot.collection_path(name),
                Err(SnapshotError::InvalidName(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_collection_round_trip_preserves_order_and_shape() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        let items = vec![
            json!({"id": 2, "title": "B", "navigation_item": {"id": 1}}),
            json!({"id": 1, "title": "A", "navigation_items": [{"id": 2}]}),
        ];

        snapshot.ensure_layout().await.unwrap();
        snapshot.write_collection("navigation-items", &items).await.unwrap();

        assert_eq!(
            snapshot.read_collection("navigation-items").await.unwrap(),
            items
        );
    }

    #[tokio::test]
    async fn test_ensure_layout_keeps_existing_collections() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        snapshot
            .write_collection("artikels", &[json!({"id": 1})])
            .await
            .unwrap();

        snapshot.ensure_layout().await.unwrap();
        snapshot.ensure_layout().await.unwrap();

        assert_eq!(snapshot.read_collection("artikels").await.unwrap().len(), 1);
        assert!(snapshot.uploads_dir().is_dir());
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());

        let err = snapshot.read_collection("artikels").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_non_array_collection_file_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        snapshot.ensure_layout().await.unwrap();
        std::fs::write(
            snapshot.collection_path("artikels").unwrap(),
            br#"{"data": []}"#,
        )
        .unwrap();

        assert!(matches!(
            snapshot.read_collection("artikels").await,
            Err(SnapshotError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn test_media_index_skips_unusable_entries() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        snapshot
            .write_media_index(&[
                json!({"id": 1, "hash": "a", "ext": ".png"}),
                json!({"name": "no id or hash"}),
                json!({"id": 3, "hash": "c", "ext": ".jpg"}),
            ])
            .await
            .unwrap();

        let assets = snapshot.read_media_index().await.unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[1].blob_file_name(), "c.jpg");
    }

    #[tokio::test]
    async fn test_copy_blobs_is_byte_for_byte() {
        let source = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());
        let payload: Vec<u8> = (0..=255).collect();
        std::fs::write(source.path().join("logo_ab12.png"), &payload).unwrap();
        std::fs::write(source.path().join("thumbnail_logo_ab12.png"), b"thumb").unwrap();
        std::fs::create_dir(source.path().join("nested")).unwrap();

        let copied = snapshot.copy_blobs_from(source.path()).await.unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            snapshot.read_blob(&asset("logo_ab12", ".png")).await.unwrap(),
            payload
        );
    }

    #[tokio::test]
    async fn test_copy_blobs_from_missing_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotStore::new(dir.path());

        let err = snapshot
            .copy_blobs_from(&dir.path().join("public/uploads"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
