//! Snapshot importer.
//!
//! Imports one collection at a time in two phases. Phase one resets the target
//! collection and creates every snapshot record without its relation fields, recording
//! the identifier the target assigned. Phase two runs once every collection has been
//! created and patches the relation fields back in, translated through the identifier
//! maps.

use std::sync::Arc;

use content_migrate_repository::{ContentStore, ContentStoreError, ListQuery};
use content_migrate_shared::RecordId;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::{CollectionConfig, ImportConfig};
use crate::media::rewrite_media_reference;
use crate::report::{SectionReport, Stage};
use crate::resolver::{build_relation_patch, RunContext};
use crate::sanitizer::{FieldRewrite, Sanitizer};
use crate::snapshot::SnapshotStore;

/// Result of phase one for one collection.
#[derive(Debug)]
pub struct CollectionImport {
    pub report: SectionReport,
    /// Snapshot records as read, kept for the relation phase. Empty when the collection
    /// was skipped.
    pub records: Vec<Value>,
}

impl CollectionImport {
    /// A collection left untouched on the target, with an aborted section.
    pub fn skipped(collection: &str, reason: impl std::fmt::Display) -> Self {
        let mut report = SectionReport::new(collection);
        report.abort(reason);
        Self {
            report,
            records: Vec::new(),
        }
    }
}

/// Imports snapshot collections into a target store.
pub struct Importer {
    target: Arc<dyn ContentStore>,
    snapshot: SnapshotStore,
    sanitizer: Sanitizer,
    config: ImportConfig,
}

impl Importer {
    pub fn new(target: Arc<dyn ContentStore>, snapshot: SnapshotStore, config: ImportConfig) -> Self {
        Self {
            target,
            snapshot,
            sanitizer: Sanitizer::default(),
            config,
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Phase one for `collection`: read the snapshot, reset the target, create records.
    ///
    /// A collection missing from the snapshot is skipped before its target is touched.
    /// A failing reset listing skips the collection; every other failure is per item.
    #[instrument(skip_all, fields(collection = %collection.name))]
    pub async fn import_collection(
        &self,
        collection: &CollectionConfig,
        context: &mut RunContext,
    ) -> CollectionImport {
        let mut report = SectionReport::new(&collection.name);

        let records = match self.snapshot.read_collection(&collection.name).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Snapshot collection unavailable, skipping");
                report.abort(e);
                return CollectionImport {
                    report,
                    records: Vec::new(),
                };
            }
        };

        if let Err(e) = self.reset_collection(&collection.name, &mut report).await {
            warn!(error = %e, "Reset listing failed, skipping collection");
            report.abort(e);
            return CollectionImport {
                report,
                records: Vec::new(),
            };
        }

        self.create_without_relations(collection, &records, context, &mut report)
            .await;

        info!(
            records = records.len(),
            created = report.successes(Stage::Create),
            failed = report.failures(Stage::Create),
            "Created records"
        );

        CollectionImport { report, records }
    }

    /// Delete the records of one bounded page of `collection`.
    ///
    /// Returns the number of deleted records. Only the listing can fail as a whole;
    /// individual delete failures are recorded and do not stop the rest.
    pub async fn reset_collection(
        &self,
        collection: &str,
        report: &mut SectionReport,
    ) -> Result<usize, ContentStoreError> {
        let page = self
            .target
            .list_records(collection, &ListQuery::bounded(self.config.reset_page_size))
            .await?;

        let mut deleted = 0;
        for item in &page.items {
            let Some(id) = RecordId::of_record(item, &self.config.id_field) else {
                report.record_skip(Stage::Reset, "<unidentified>", "target record has no identifier");
                continue;
            };
            match self.target.delete_record(collection, &id).await {
                Ok(()) => {
                    deleted += 1;
                    report.record_success(Stage::Reset, &id);
                }
                Err(e) => {
                    warn!(collection = %collection, target_id = %id, error = %e, "Failed to delete record");
                    report.record_failure(Stage::Reset, &id, e);
                }
            }
        }

        if page.has_next() {
            warn!(
                collection = %collection,
                page_size = self.config.reset_page_size,
                page_count = page.page_count,
                "Target collection exceeds one reset page, older records remain"
            );
        }
        debug!(collection = %collection, deleted, "Reset collection");
        Ok(deleted)
    }

    /// Build the create payload for `record`.
    ///
    /// Declared relation fields are removed from the top level, forbidden fields are
    /// stripped at every depth and declared media fields are rewritten to target file
    /// references (or dropped when unresolved).
    pub fn prepare_create_payload(
        &self,
        record: &Value,
        collection: &CollectionConfig,
        context: &RunContext,
    ) -> Value {
        let without_relations = match record {
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .filter(|(key, _)| !collection.is_relation_field(key))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            other => other.clone(),
        };

        let id_field = self.config.id_field.as_str();
        let files = context.files();
        let mut rewrite = |key: &str, value: &Value| {
            if collection.is_media_field(key) {
                rewrite_media_reference(value, id_field, files)
            } else {
                FieldRewrite::Keep
            }
        };
        self.sanitizer.sanitize_with(&without_relations, &mut rewrite)
    }

    /// Create every record of `records` without relations, recording source to target ids.
    pub async fn create_without_relations(
        &self,
        collection: &CollectionConfig,
        records: &[Value],
        context: &mut RunContext,
        report: &mut SectionReport,
    ) {
        for (position, record) in records.iter().enumerate() {
            let source_id = RecordId::of_record(record, &self.config.id_field);
            let item = source_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("#{}", position));

            let payload = self.prepare_create_payload(record, collection, context);
            let created = match self.target.create_record(&collection.name, &payload).await {
                Ok(created) => created,
                Err(e) => {
                    warn!(collection = %collection.name, source_id = %item, error = %e, "Failed to create record");
                    report.record_failure(Stage::Create, &item, e);
                    continue;
                }
            };

            let Some(target_id) = RecordId::of_record(&created, &self.config.id_field) else {
                warn!(collection = %collection.name, source_id = %item, "Created record carries no identifier");
                report.record_failure(Stage::Create, &item, "created record carries no identifier");
                continue;
            };

            match source_id {
                Some(source_id) => {
                    if !context
                        .record_ids_mut(&collection.name)
                        .record(source_id.clone(), target_id.clone())
                    {
                        warn!(
                            collection = %collection.name,
                            source_id = %source_id,
                            "Duplicate source id in snapshot, keeping first mapping"
                        );
                    }
                }
                None => warn!(
                    collection = %collection.name,
                    position,
                    "Snapshot record has no identifier, its relations cannot be restored"
                ),
            }
            debug!(collection = %collection.name, source_id = %item, target_id = %target_id, "Created record");
            report.record_success(Stage::Create, &item);
        }
    }

    /// Phase two for `collection`: patch the declared relations of every created record.
    ///
    /// Records that were not created have no mapping and are passed over. Records whose
    /// relations all resolve to nothing get no request at all.
    #[instrument(skip_all, fields(collection = %collection.name))]
    pub async fn restore_relations(
        &self,
        collection: &CollectionConfig,
        records: &[Value],
        context: &RunContext,
        report: &mut SectionReport,
    ) {
        if !collection.has_relations() {
            return;
        }

        let mut patched = 0;
        for record in records {
            let Some(source_id) = RecordId::of_record(record, &self.config.id_field) else {
                continue;
            };
            let Some(target_id) = context
                .record_ids(&collection.name)
                .and_then(|ids| ids.resolve(&source_id))
            else {
                continue;
            };

            let patch = build_relation_patch(record, &collection.relations, &self.config.id_field, context);
            if patch.is_empty() {
                report.record_skip(Stage::Relations, &source_id, "no resolvable relations");
                continue;
            }

            match self
                .target
                .update_record(&collection.name, target_id, &Value::Object(patch))
                .await
            {
                Ok(()) => {
                    patched += 1;
                    report.record_success(Stage::Relations, &source_id);
                }
                Err(e) => {
                    warn!(source_id = %source_id, target_id = %target_id, error = %e, "Failed to restore relations");
                    report.record_failure(Stage::Relations, &source_id, e);
                }
            }
        }

        info!(patched, "Restored relations");
    }
}
