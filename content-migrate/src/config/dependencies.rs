//! Dependency initialization and wiring for a migration run.

use std::sync::Arc;

use content_migrate_repository::{ContentStore, HttpContentStore, StoreConfig};
use tracing::info;

use crate::config::MigrationConfig;
use crate::errors::MigrationError;
use crate::exporter::Exporter;
use crate::orchestrator::{ImportPipeline, MigrationOrchestrator};
use crate::snapshot::SnapshotStore;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: MigrationOrchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`crate::config`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(MigrationError)` - If the configuration is missing or invalid
    pub fn new() -> Result<Self, MigrationError> {
        Self::from_config(MigrationConfig::from_env()?)
    }

    /// Wire the store clients and pipeline components described by `config`.
    pub fn from_config(config: MigrationConfig) -> Result<Self, MigrationError> {
        info!(
            mode = ?config.mode,
            snapshot_dir = %config.snapshot_dir.display(),
            collections = config.collections.len(),
            source = ?config.source,
            target = ?config.target,
            "Initializing dependencies"
        );

        let snapshot = SnapshotStore::new(&config.snapshot_dir);
        let mut orchestrator = MigrationOrchestrator::new(config.collections.clone());

        if config.mode.exports() {
            let source = Self::connect("SOURCE_API_URL", config.source.clone())?;
            let exporter = Exporter::new(source, snapshot.clone())
                .with_media(config.export_media)
                .with_media_source_dir(config.media_source_dir.clone());
            orchestrator = orchestrator.with_exporter(exporter);
        }

        if config.mode.imports() {
            let target = Self::connect("TARGET_API_URL", config.target.clone())?;
            orchestrator = orchestrator.with_import(ImportPipeline::new(
                target,
                snapshot,
                config.import.clone(),
            ));
        }

        Ok(Self { orchestrator })
    }

    fn connect(
        variable: &str,
        store: Option<StoreConfig>,
    ) -> Result<Arc<dyn ContentStore>, MigrationError> {
        let store = store
            .ok_or_else(|| MigrationError::config(format!("{} is not configured", variable)))?;
        let client = HttpContentStore::new(store).map_err(|e| {
            MigrationError::config(format!("Failed to create content store client: {}", e))
        })?;
        Ok(Arc::new(client))
    }
}
