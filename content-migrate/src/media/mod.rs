//! Media deduplication and upload.

use std::collections::HashMap;
use std::sync::Arc;

use content_migrate_repository::{ContentStore, MediaUpload};
use content_migrate_shared::{IdentifierMap, MediaAsset, RecordId};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::report::{SectionReport, Stage};
use crate::resolver::RunContext;
use crate::sanitizer::FieldRewrite;
use crate::snapshot::SnapshotStore;

/// Name of the report section holding upload outcomes.
pub const MEDIA_SECTION: &str = "media";

/// All media index entries that share one content hash.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaGroup {
    /// Entry whose metadata is used for the upload (the last one seen).
    pub representative: MediaAsset,
    /// Every source file id carrying this hash, in index order.
    pub source_ids: Vec<RecordId>,
}

/// Group `assets` by content hash, in order of first appearance.
pub fn dedupe_by_hash(assets: &[MediaAsset]) -> Vec<MediaGroup> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<MediaGroup> = Vec::new();

    for asset in assets {
        match positions.get(asset.content_hash.as_str()) {
            Some(&position) => {
                let group = &mut groups[position];
                group.representative = asset.clone();
                group.source_ids.push(asset.id.clone());
            }
            None => {
                positions.insert(&asset.content_hash, groups.len());
                groups.push(MediaGroup {
                    representative: asset.clone(),
                    source_ids: vec![asset.id.clone()],
                });
            }
        }
    }

    groups
}

/// Uploads each distinct blob of a snapshot once and fills the run's file map.
pub struct MediaUploader {
    target: Arc<dyn ContentStore>,
    snapshot: SnapshotStore,
}

impl MediaUploader {
    pub fn new(target: Arc<dyn ContentStore>, snapshot: SnapshotStore) -> Self {
        Self { target, snapshot }
    }

    /// Upload the snapshot's media into the target store.
    ///
    /// A missing blob or a rejected upload is recorded and skipped; records referencing
    /// that asset later resolve to no media. A snapshot without a media index uploads
    /// nothing.
    #[instrument(skip_all)]
    pub async fn upload_all(&self, context: &mut RunContext) -> SectionReport {
        let mut report = SectionReport::new(MEDIA_SECTION);

        let assets = match self.snapshot.read_media_index().await {
            Ok(assets) => assets,
            Err(e) if e.is_not_found() => {
                info!("Snapshot has no media index, skipping media upload");
                return report;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read media index");
                report.abort(e);
                return report;
            }
        };

        let groups = dedupe_by_hash(&assets);
        info!(
            assets = assets.len(),
            distinct_blobs = groups.len(),
            "Uploading media"
        );

        for group in groups {
            self.upload_group(&group, context, &mut report).await;
        }

        report
    }

    async fn upload_group(&self, group: &MediaGroup, context: &mut RunContext, report: &mut SectionReport) {
        let asset = &group.representative;
        let blob = asset.blob_file_name();

        let bytes = match self.snapshot.read_blob(asset).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(blob = %blob, error = %e, "Media blob unavailable, skipping");
                report.record_failure(Stage::Upload, &blob, e);
                return;
            }
        };

        let upload = MediaUpload {
            file_name: asset.upload_name(),
            mime: asset.mime.clone(),
            bytes,
        };
        match self.target.upload_media(&upload).await {
            Ok(uploaded) => {
                let files = context.files_mut();
                for source_id in &group.source_ids {
                    if !files.record(source_id.clone(), uploaded.id.clone()) {
                        warn!(source_id = %source_id, "Media source id already mapped, keeping first mapping");
                    }
                }
                debug!(blob = %blob, target_id = %uploaded.id, "Uploaded media");
                report.record_success(Stage::Upload, &blob);
            }
            Err(e) => {
                warn!(blob = %blob, error = %e, "Media upload failed, skipping");
                report.record_failure(Stage::Upload, &blob, e);
            }
        }
    }
}

/// Rewrite a media field value into target file references.
///
/// A single reference becomes `{id_field: target}`; a list keeps its resolved elements
/// in that form. Null values, unresolved references and lists without any resolved
/// element drop the field.
pub fn rewrite_media_reference(value: &Value, id_field: &str, files: &IdentifierMap) -> FieldRewrite {
    let reference = |item: &Value| {
        RecordId::from_reference(item, id_field)
            .and_then(|source| files.resolve(&source))
            .map(|target| {
                let mut object = Map::new();
                object.insert(id_field.to_string(), target.to_value());
                Value::Object(object)
            })
    };

    let rewritten = match value {
        Value::Null => None,
        Value::Array(items) => {
            let resolved: Vec<Value> = items.iter().filter_map(reference).collect();
            (!resolved.is_empty()).then_some(Value::Array(resolved))
        }
        single => reference(single),
    };

    match rewritten {
        Some(value) => FieldRewrite::Replace(value),
        None => FieldRewrite::Drop,
    }
}
