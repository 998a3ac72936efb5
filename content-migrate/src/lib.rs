//! # Content Migrate
//!
//! Moves the content of a headless content store (collections, nested components,
//! relations and media) into another store, or into a portable snapshot and back.
//!
//! ## Architecture
//!
//! The pipeline follows the Exporter-Snapshot-Importer pattern:
//!
//! 1. **Exporter**: Reads collections and media from the source store
//! 2. **Snapshot**: Keeps the export on disk, one file per collection
//! 3. **Importer**: Resets target collections and recreates records in two phases
//! 4. **Orchestrator**: Sequences the phases of a run
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`exporter`]: Source store to snapshot
//! - [`snapshot`]: On-disk snapshot layout
//! - [`sanitizer`]: Strips server-assigned fields from record trees
//! - [`media`]: Media deduplication and upload
//! - [`resolver`]: Run-scoped identifier maps and relation translation
//! - [`importer`]: Snapshot to target store
//! - [`orchestrator`]: Coordinates a run
//! - [`report`]: Per-item outcomes of a run
//! - [`errors`]: Error types for the pipeline

pub mod config;
pub mod errors;
pub mod exporter;
pub mod importer;
pub mod media;
pub mod orchestrator;
pub mod report;
pub mod resolver;
pub mod sanitizer;
pub mod snapshot;

pub use config::dependencies::Dependencies;
pub use config::{CollectionConfig, ImportConfig, MigrationConfig, RelationField, RunMode};
pub use errors::{MigrationError, SnapshotError};
pub use orchestrator::{ImportPipeline, MigrationOrchestrator};
pub use report::RunReport;
