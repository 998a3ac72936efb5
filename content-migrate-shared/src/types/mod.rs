//! This module defines the core data structures used across the content migration pipeline.
//! It re-exports `RecordId`, `MediaAsset` and `IdentifierMap`.

pub mod identifier_map;
pub mod media_asset;
pub mod record_id;

pub use identifier_map::IdentifierMap;
pub use media_asset::MediaAsset;
pub use record_id::RecordId;
