//! Orchestrator for a migration run.
//!
//! Sequences the exporter and the import phases: media upload, reset and create for
//! every collection in order, then relation restoration for collections declaring
//! relations. A collection whose export failed earlier in the same run is not imported.

use std::collections::HashSet;
use std::sync::Arc;

use content_migrate_repository::{ContentStore, ContentStoreError, ListQuery};
use tracing::{info, instrument, warn};

use crate::config::{CollectionConfig, ImportConfig};
use crate::errors::MigrationError;
use crate::exporter::Exporter;
use crate::importer::{CollectionImport, Importer};
use crate::media::MediaUploader;
use crate::report::{RunReport, SectionReport, Stage};
use crate::resolver::RunContext;
use crate::snapshot::SnapshotStore;

/// Everything the import phases need.
pub struct ImportPipeline {
    target: Arc<dyn ContentStore>,
    uploader: MediaUploader,
    importer: Importer,
}

impl ImportPipeline {
    pub fn new(target: Arc<dyn ContentStore>, snapshot: SnapshotStore, config: ImportConfig) -> Self {
        Self {
            uploader: MediaUploader::new(target.clone(), snapshot.clone()),
            importer: Importer::new(target.clone(), snapshot, config),
            target,
        }
    }
}

/// Runs the configured phases over the configured collections.
pub struct MigrationOrchestrator {
    collections: Vec<CollectionConfig>,
    exporter: Option<Exporter>,
    import: Option<ImportPipeline>,
}

impl MigrationOrchestrator {
    /// Create an orchestrator with no phases for `collections`, in import order.
    pub fn new(collections: Vec<CollectionConfig>) -> Self {
        Self {
            collections,
            exporter: None,
            import: None,
        }
    }

    /// Run `exporter` before any import.
    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_import(mut self, import: ImportPipeline) -> Self {
        self.import = Some(import);
        self
    }

    pub fn collections(&self) -> &[CollectionConfig] {
        &self.collections
    }

    /// Run every configured phase.
    ///
    /// Item and collection failures end up in the report; only a phase that cannot start
    /// (unwritable snapshot, unreachable target) returns an error.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<RunReport, MigrationError> {
        let mut report = RunReport::new();
        info!(collections = self.collections.len(), "Starting migration run");

        if let Some(exporter) = &self.exporter {
            report.export = exporter.export_all(&self.collections).await?;
        }

        if let Some(import) = &self.import {
            let failed_exports: HashSet<&str> = report
                .export
                .iter()
                .filter(|section| section.failures(Stage::Export) > 0)
                .map(|section| section.name.as_str())
                .collect();
            report.import = self.run_import(import, &failed_exports).await?;
        }

        report.finish();
        Ok(report)
    }

    async fn run_import(
        &self,
        import: &ImportPipeline,
        failed_exports: &HashSet<&str>,
    ) -> Result<Vec<SectionReport>, MigrationError> {
        self.check_target_ready(import.target.as_ref()).await?;

        let mut context = RunContext::new();
        let mut sections = Vec::with_capacity(self.collections.len() + 1);

        sections.push(import.uploader.upload_all(&mut context).await);

        let mut imports: Vec<CollectionImport> = Vec::with_capacity(self.collections.len());
        for collection in &self.collections {
            if failed_exports.contains(collection.name.as_str()) {
                warn!(collection = %collection.name, "Export failed in this run, skipping import");
                imports.push(CollectionImport::skipped(&collection.name, "export failed in this run"));
                continue;
            }
            imports.push(import.importer.import_collection(collection, &mut context).await);
        }

        for (collection, outcome) in self.collections.iter().zip(imports.iter_mut()) {
            if outcome.report.is_aborted() || !collection.has_relations() {
                continue;
            }
            import
                .importer
                .restore_relations(collection, &outcome.records, &context, &mut outcome.report)
                .await;
        }

        sections.extend(imports.into_iter().map(|outcome| outcome.report));
        Ok(sections)
    }

    /// Make sure the target answers at all before touching it.
    ///
    /// Only transport failures count as unreachable; an error status still proves the
    /// endpoint is up, and per-collection handling takes over from there.
    async fn check_target_ready(&self, target: &dyn ContentStore) -> Result<(), MigrationError> {
        let Some(first) = self.collections.first() else {
            return Ok(());
        };

        match target.list_records(&first.name, &ListQuery::bounded(1)).await {
            Ok(_) => Ok(()),
            Err(
                e @ (ContentStoreError::ConnectionError(_)
                | ContentStoreError::Interrupted(_)
                | ContentStoreError::Timeout(_)),
            ) => {
                Err(MigrationError::unreachable(format!("target store: {}", e)))
            }
            Err(e) => {
                warn!(collection = %first.name, error = %e, "Target readiness check returned an error");
                Ok(())
            }
        }
    }
}
